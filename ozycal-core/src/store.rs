//! CSV-backed datalink logs.
//!
//! Each datalink owns one file at `<data_dir>/<name>.csv`:
//!
//! ```text
//! sequenceId,start,end,calendar,eventId,<property1>,<property2>,...
//! 1,2024-01-01T09:00:00,2024-01-01T10:00:00,primary,evt_abc,value1,value2
//! ```
//!
//! Rows are keyed by `eventId`. `sequenceId` is assigned once when an event is
//! first written and never changes. Writes rewrite the whole file, so every
//! read-modify-write holds an exclusive lock on `<name>.csv.lock` and replaces
//! the file through a temp file + rename.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use indexmap::IndexMap;

use crate::error::{DatalinkError, DatalinkResult};
use crate::record::DatalinkRecord;
use crate::spec::{BASE_COLUMNS, DatalinkSpec};
use crate::timestamp::{DateRange, Timestamp};

/// A row of a datalink log.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub sequence_id: u64,
    pub start: Timestamp,
    pub end: Timestamp,
    pub calendar: String,
    pub event_id: String,
    /// Property cells in header order
    pub properties: IndexMap<String, String>,
}

impl StoredRow {
    fn from_record(sequence_id: u64, record: &DatalinkRecord, spec: &DatalinkSpec) -> Self {
        let properties = spec
            .property_names()
            .map(|name| {
                let cell = record
                    .properties
                    .get(name)
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                (name.to_string(), cell)
            })
            .collect();

        StoredRow {
            sequence_id,
            start: record.event.start,
            end: record.event.end,
            calendar: record.event.calendar.clone(),
            event_id: record.event.id.clone(),
            properties,
        }
    }

    /// Column name → cell text, in header order.
    pub fn to_map(&self) -> IndexMap<String, String> {
        let base = [
            self.sequence_id.to_string(),
            self.start.to_iso(),
            self.end.to_iso(),
            self.calendar.clone(),
            self.event_id.clone(),
        ];

        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .zip(base)
            .chain(self.properties.clone())
            .collect()
    }

    fn cells(&self) -> Vec<String> {
        self.to_map().into_values().collect()
    }

    fn parse(
        header: &csv::StringRecord,
        row: &csv::StringRecord,
        path: &Path,
    ) -> DatalinkResult<Self> {
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let corrupt = |reason: String| DatalinkError::store(path, format!("line {line}: {reason}"));

        if row.len() != header.len() {
            return Err(corrupt(format!(
                "expected {} columns, found {}",
                header.len(),
                row.len()
            )));
        }

        let sequence_id = row[0]
            .parse::<u64>()
            .ok()
            .filter(|id| *id >= 1)
            .ok_or_else(|| corrupt(format!("invalid sequenceId '{}'", &row[0])))?;
        let start = Timestamp::parse(&row[1]).map_err(corrupt)?;
        let end = Timestamp::parse(&row[2]).map_err(corrupt)?;

        let properties = header
            .iter()
            .zip(row.iter())
            .skip(BASE_COLUMNS.len())
            .map(|(name, cell)| (name.to_string(), cell.to_string()))
            .collect();

        Ok(StoredRow {
            sequence_id,
            start,
            end,
            calendar: row[3].to_string(),
            event_id: row[4].to_string(),
            properties,
        })
    }
}

/// Counts reported by [`DatalinkStore::upsert`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
}

/// Held for the duration of a store operation; dropping it releases the lock.
struct StoreLock {
    _file: File,
}

pub struct DatalinkStore {
    spec: DatalinkSpec,
    path: PathBuf,
}

impl DatalinkStore {
    pub fn new(data_dir: &Path, spec: DatalinkSpec) -> Self {
        let path = Self::path_for(data_dir, &spec.name);
        DatalinkStore { spec, path }
    }

    pub fn path_for(data_dir: &Path, name: &str) -> PathBuf {
        data_dir.join(format!("{}.csv", name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> &DatalinkSpec {
        &self.spec
    }

    /// Create the log with its header row if it doesn't exist yet.
    pub fn ensure_initialized(&self) -> DatalinkResult<()> {
        if self.path.exists() {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let _lock = self.lock_exclusive()?;

        // Another writer may have created it while we waited
        if self.path.exists() {
            return Ok(());
        }

        self.write_rows(&[])?;
        tracing::debug!(
            datalink = %self.spec.name,
            path = %self.path.display(),
            "created datalink log"
        );

        Ok(())
    }

    /// Rows whose start lies within `range` (inclusive).
    pub fn read(&self, range: &DateRange) -> DatalinkResult<Vec<StoredRow>> {
        let _lock = self.lock_shared()?;

        let rows = self
            .load_rows()?
            .into_iter()
            .filter(|row| range.contains(&row.start))
            .collect();

        Ok(rows)
    }

    /// All-or-nothing check of a batch against this store's spec.
    pub fn validate(&self, records: &[DatalinkRecord]) -> DatalinkResult<()> {
        for record in records {
            if record.datalink_name != self.spec.name {
                return Err(DatalinkError::Validation(format!(
                    "Record for datalink '{}' pushed to '{}'",
                    record.datalink_name, self.spec.name
                )));
            }

            let missing: Vec<&str> = self
                .spec
                .property_names()
                .filter(|name| !record.properties.contains_key(*name))
                .collect();
            let unexpected: Vec<&str> = record
                .properties
                .keys()
                .map(String::as_str)
                .filter(|name| !self.spec.properties.contains_key(*name))
                .collect();

            if !missing.is_empty() || !unexpected.is_empty() {
                return Err(DatalinkError::Validation(format!(
                    "Properties of event '{}' do not match datalink '{}' (missing: [{}], unexpected: [{}])",
                    record.event.id,
                    self.spec.name,
                    missing.join(", "),
                    unexpected.join(", ")
                )));
            }

            record.event.check().map_err(DatalinkError::Validation)?;
        }

        Ok(())
    }

    /// Insert new events and overwrite rows of events already in the log.
    ///
    /// Existing rows keep their `sequenceId`; new rows get the next free id.
    /// If the same event appears twice in `records`, the later one wins.
    pub fn upsert(&self, records: &[DatalinkRecord]) -> DatalinkResult<UpsertStats> {
        self.validate(records)?;
        self.ensure_initialized()?;

        let _lock = self.lock_exclusive()?;

        let mut rows = self.load_rows()?;
        let mut by_event_id: HashMap<String, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.event_id.clone(), i))
            .collect();
        let mut last_id = max_id(&rows);
        let mut stats = UpsertStats::default();

        for record in records {
            match by_event_id.get(&record.event.id) {
                Some(&i) => {
                    let sequence_id = rows[i].sequence_id;
                    rows[i] = StoredRow::from_record(sequence_id, record, &self.spec);
                    stats.updated += 1;
                }
                None => {
                    last_id = id_after(last_id, &self.path)?;
                    rows.push(StoredRow::from_record(last_id, record, &self.spec));
                    by_event_id.insert(record.event.id.clone(), rows.len() - 1);
                    stats.inserted += 1;
                }
            }
        }

        self.write_rows(&rows)?;

        tracing::debug!(
            datalink = %self.spec.name,
            inserted = stats.inserted,
            updated = stats.updated,
            "upserted datalink rows"
        );

        Ok(stats)
    }

    /// One more than the largest `sequenceId` in the log, or 1 if it has no rows.
    pub fn next_id(&self) -> DatalinkResult<u64> {
        let _lock = self.lock_shared()?;
        id_after(max_id(&self.load_rows()?), &self.path)
    }

    fn load_rows(&self) -> DatalinkResult<Vec<StoredRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;
        let mut records = reader.records();

        let Some(header) = records.next().transpose()? else {
            // Empty file: no header yet, no rows
            return Ok(Vec::new());
        };

        let expected = self.spec.header();
        if !header.iter().eq(expected.iter().map(String::as_str)) {
            return Err(DatalinkError::store(
                &self.path,
                format!(
                    "header [{}] does not match datalink spec [{}]",
                    header.iter().collect::<Vec<_>>().join(","),
                    expected.join(",")
                ),
            ));
        }

        records
            .map(|row| StoredRow::parse(&header, &row?, &self.path))
            .collect()
    }

    fn write_rows(&self, rows: &[StoredRow]) -> DatalinkResult<()> {
        let temp = self.sibling("tmp");

        let mut writer = csv::Writer::from_path(&temp)?;
        writer.write_record(self.spec.header())?;
        for row in rows {
            writer.write_record(row.cells())?;
        }
        writer.flush()?;
        drop(writer);

        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn lock_exclusive(&self) -> DatalinkResult<StoreLock> {
        let file = self.open_lock_file()?;
        file.lock_exclusive()?;
        Ok(StoreLock { _file: file })
    }

    fn lock_shared(&self) -> DatalinkResult<StoreLock> {
        let file = self.open_lock_file()?;
        FileExt::lock_shared(&file)?;
        Ok(StoreLock { _file: file })
    }

    fn open_lock_file(&self) -> DatalinkResult<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.sibling("lock"))?;
        Ok(file)
    }

    /// `<name>.csv.<suffix>` next to the log
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}

fn max_id(rows: &[StoredRow]) -> u64 {
    rows.iter().map(|row| row.sequence_id).max().unwrap_or(0)
}

fn id_after(last_id: u64, path: &Path) -> DatalinkResult<u64> {
    last_id
        .checked_add(1)
        .ok_or_else(|| DatalinkError::store(path, "sequenceId space exhausted"))
}
