//! Pull and push across every configured datalink.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::OzycalConfig;
use crate::error::{DatalinkError, DatalinkResult};
use crate::event::CalendarEvent;
use crate::record::{DatalinkRecord, PropertyValue};
use crate::resolver::SpecResolver;
use crate::spec::{DatalinkSpec, FieldSpec};
use crate::store::{DatalinkStore, StoredRow};
use crate::timestamp::DateRange;

/// Title given to pulled events when the spec names no title property.
pub const UNKNOWN_TITLE: &str = "UNKNOWN";

pub struct Orchestrator {
    data_dir: PathBuf,
    specs: Vec<DatalinkSpec>,
}

impl Orchestrator {
    pub fn new(data_dir: impl Into<PathBuf>, specs: Vec<DatalinkSpec>) -> Self {
        Orchestrator {
            data_dir: data_dir.into(),
            specs,
        }
    }

    pub fn from_config(config: &OzycalConfig) -> Self {
        Self::new(config.data_path(), config.event_datalinks.clone())
    }

    /// Specs with every field's options loaded.
    pub fn specs(&self) -> DatalinkResult<Vec<DatalinkSpec>> {
        SpecResolver::new(&self.data_dir).resolve(&self.specs)
    }

    /// Create any datalink log that doesn't exist yet.
    pub fn init_stores(&self) -> DatalinkResult<()> {
        for spec in &self.specs {
            DatalinkStore::new(&self.data_dir, spec.clone()).ensure_initialized()?;
        }
        Ok(())
    }

    /// Records of every datalink whose event starts within `range`.
    ///
    /// Every datalink appears in the result, with an empty list if nothing
    /// matched. An unreadable log fails the whole pull.
    ///
    /// Logs store every cell as text. A cell equal to one of its field's
    /// option values comes back with that option's type. Anything else,
    /// including numbers and booleans pushed to a freeform field, comes back
    /// as a [`PropertyValue::String`].
    pub fn pull(
        &self,
        range: &DateRange,
    ) -> DatalinkResult<BTreeMap<String, Vec<DatalinkRecord>>> {
        self.init_stores()?;

        let mut result = BTreeMap::new();

        for spec in self.specs()? {
            let store = DatalinkStore::new(&self.data_dir, spec);
            let records = store
                .read(range)?
                .iter()
                .map(|row| record_from_row(store.spec(), row))
                .collect();

            result.insert(store.spec().name.clone(), records);
        }

        Ok(result)
    }

    /// Write one datalink's records. Returns false (and logs why) on any
    /// failure; nothing is written unless the whole batch is valid.
    pub fn push_one(&self, records: &[DatalinkRecord]) -> bool {
        match self.try_push_one(records) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error pushing to event datalink: {}", e);
                false
            }
        }
    }

    fn try_push_one(&self, records: &[DatalinkRecord]) -> DatalinkResult<()> {
        let Some(first) = records.first() else {
            return Err(DatalinkError::Validation("No rows to push".to_string()));
        };

        let name = &first.datalink_name;
        if records.iter().any(|r| &r.datalink_name != name) {
            return Err(DatalinkError::Validation(
                "Cannot push to multiple event datalinks at once".to_string(),
            ));
        }

        let spec = self
            .specs
            .iter()
            .find(|s| &s.name == name)
            .ok_or_else(|| DatalinkError::UnknownDatalink(name.clone()))?;

        let spec = SpecResolver::new(&self.data_dir).resolve_spec(spec)?;
        let store = DatalinkStore::new(&self.data_dir, spec);
        let stats = store.upsert(records)?;

        tracing::info!(
            datalink = %name,
            inserted = stats.inserted,
            updated = stats.updated,
            "pushed event datalinks"
        );

        Ok(())
    }

    /// Push records grouped by datalink. Returns the names of the datalinks
    /// whose group failed; an empty list means everything was written.
    pub fn push_many(&self, records: Vec<DatalinkRecord>) -> Vec<String> {
        let mut groups: BTreeMap<String, Vec<DatalinkRecord>> = BTreeMap::new();
        for record in records {
            groups
                .entry(record.datalink_name.clone())
                .or_default()
                .push(record);
        }

        let mut failed = Vec::new();
        for (name, group) in groups {
            if !self.push_one(&group) {
                tracing::warn!("Failed to push to datalink: {}", name);
                failed.push(name);
            }
        }

        failed
    }
}

fn record_from_row(spec: &DatalinkSpec, row: &StoredRow) -> DatalinkRecord {
    let title = spec
        .event_title_source_property
        .as_ref()
        .and_then(|prop| row.properties.get(prop))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    let properties = spec
        .properties
        .iter()
        .map(|(name, field)| {
            let cell = row.properties.get(name).map(String::as_str).unwrap_or_default();
            (name.clone(), typed_value(field, cell))
        })
        .collect();

    DatalinkRecord {
        datalink_name: spec.name.clone(),
        event: CalendarEvent {
            id: row.event_id.clone(),
            title,
            start: row.start,
            end: row.end,
            calendar: row.calendar.clone(),
        },
        properties,
    }
}

/// Cells are plain text; give back the option's own value when the text
/// matches one, so numeric and boolean options keep their type.
fn typed_value(field: &FieldSpec, cell: &str) -> PropertyValue {
    field
        .options
        .inline()
        .and_then(|options| options.iter().find(|o| o.value.to_string() == cell))
        .map(|o| o.value.clone())
        .unwrap_or_else(|| PropertyValue::String(cell.to_string()))
}
