//! ISO-8601 timestamps as stored in datalink logs, and inclusive time ranges.

use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone,
};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A point in time as written by the calendar frontend.
///
/// Timestamps are kept in the form they arrived in so that a value written to
/// a store reads back as the same string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    /// No offset, e.g. `2024-03-04T09:00:00`
    Floating(NaiveDateTime),
    /// With an explicit offset, e.g. `2024-03-04T09:00:00+01:00`
    Offset(DateTime<FixedOffset>),
}

impl Timestamp {
    /// Parse an ISO-8601 date-time. A bare date is taken as midnight.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Timestamp::Offset(dt));
        }

        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Timestamp::Floating(dt));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Timestamp::Floating(date.and_time(chrono::NaiveTime::MIN)));
        }

        Err(format!("Invalid ISO-8601 timestamp '{}'", s))
    }

    /// Render back to ISO-8601. Fractional seconds only appear when non-zero.
    pub fn to_iso(&self) -> String {
        match self {
            Timestamp::Floating(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Timestamp::Offset(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, false),
        }
    }

    /// The instant used for ordering. Floating values are read as UTC.
    pub fn instant(&self) -> NaiveDateTime {
        match self {
            Timestamp::Floating(dt) => *dt,
            Timestamp::Offset(dt) => dt.naive_utc(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_iso())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Timestamp::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Inclusive time range for filtering stored rows by their start time.
/// None values mean unbounded in that direction.
#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl DateRange {
    pub fn new(from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        DateRange { from, to }
    }

    pub fn unbounded() -> Self {
        DateRange::default()
    }

    /// Monday 00:00:00 through Sunday 23:59:59 of the week containing `date`,
    /// as wall-clock time in `tz`.
    ///
    /// Bounds carry the zone's offset on each day, so a week that crosses a
    /// DST change starts and ends on local midnight regardless.
    pub fn week_of(date: NaiveDate, tz: Tz) -> Result<Self, String> {
        let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
        let sunday = monday + Duration::days(6);

        Ok(DateRange {
            from: Some(day_start_in(monday, tz)?),
            to: Some(day_end_in(sunday, tz)?),
        })
    }

    /// Build a range from command-line style arguments.
    /// - `from`: YYYY-MM-DD (start of day in `tz`) or a full timestamp
    /// - `to`: YYYY-MM-DD (end of day in `tz`) or a full timestamp
    pub fn from_args(from: Option<&str>, to: Option<&str>, tz: Tz) -> Result<Self, String> {
        let from = from.map(|s| parse_bound(s, tz, day_start_in)).transpose()?;
        let to = to.map(|s| parse_bound(s, tz, day_end_in)).transpose()?;

        Ok(DateRange { from, to })
    }

    pub fn contains(&self, ts: &Timestamp) -> bool {
        let instant = ts.instant();

        let after_start = self.from.is_none_or(|from| from.instant() <= instant);
        let before_end = self.to.is_none_or(|to| instant <= to.instant());

        after_start && before_end
    }
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::seconds(86_399)
}

/// First instant of `date` in `tz`. A midnight skipped by a DST gap resolves
/// to the first wall-clock hour after it.
fn day_start_in(date: NaiveDate, tz: Tz) -> Result<Timestamp, String> {
    let local = start_of_day(date);

    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| Timestamp::Offset(dt.fixed_offset()))
        .ok_or_else(|| format!("{} has no local midnight in {}", date, tz))
}

/// Last second of `date` in `tz`.
fn day_end_in(date: NaiveDate, tz: Tz) -> Result<Timestamp, String> {
    let local = end_of_day(date);

    tz.from_local_datetime(&local)
        .latest()
        .or_else(|| tz.from_local_datetime(&(local - Duration::hours(1))).latest())
        .map(|dt| Timestamp::Offset(dt.fixed_offset()))
        .ok_or_else(|| format!("{} has no local end of day in {}", date, tz))
}

/// Plain dates are widened with `day_bound`; anything else must be a timestamp.
fn parse_bound(
    s: &str,
    tz: Tz,
    day_bound: fn(NaiveDate, Tz) -> Result<Timestamp, String>,
) -> Result<Timestamp, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return day_bound(date, tz);
    }

    Timestamp::parse(s).map_err(|_| {
        format!(
            "Invalid date '{}'. Expected YYYY-MM-DD or an ISO-8601 timestamp",
            s
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn test_floating_timestamp_renders_unchanged() {
        assert_eq!(ts("2024-03-04T09:00:00").to_iso(), "2024-03-04T09:00:00");
        assert_eq!(
            ts("2024-03-04T09:00:00.250").to_iso(),
            "2024-03-04T09:00:00.250"
        );
    }

    #[test]
    fn test_offset_timestamp_renders_with_offset() {
        assert_eq!(
            ts("2024-03-04T09:00:00+01:00").to_iso(),
            "2024-03-04T09:00:00+01:00"
        );
        assert_eq!(ts("2024-03-04T09:00:00Z").to_iso(), "2024-03-04T09:00:00+00:00");
    }

    #[test]
    fn test_bare_date_is_midnight() {
        assert_eq!(ts("2024-03-04").to_iso(), "2024-03-04T00:00:00");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Timestamp::parse("next tuesday").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn test_instant_normalizes_offsets() {
        assert_eq!(
            ts("2024-03-04T10:00:00+01:00").instant(),
            ts("2024-03-04T09:00:00").instant()
        );
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = DateRange::new(
            Some(ts("2024-03-04T09:00:00")),
            Some(ts("2024-03-04T10:00:00")),
        );

        assert!(range.contains(&ts("2024-03-04T09:00:00")));
        assert!(range.contains(&ts("2024-03-04T10:00:00")));
        assert!(!range.contains(&ts("2024-03-04T10:00:01")));
        assert!(!range.contains(&ts("2024-03-04T08:59:59")));
    }

    #[test]
    fn test_unbounded_range_contains_everything() {
        let range = DateRange::unbounded();
        assert!(range.contains(&ts("1900-01-01T00:00:00")));
        assert!(range.contains(&ts("2999-12-31T23:59:59")));
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_of_spans_monday_to_sunday() {
        // Thursday
        let range = DateRange::week_of(day(2024, 3, 7), Tz::UTC).unwrap();
        assert_eq!(range.from.unwrap().to_iso(), "2024-03-04T00:00:00+00:00");
        assert_eq!(range.to.unwrap().to_iso(), "2024-03-10T23:59:59+00:00");
    }

    #[test]
    fn test_week_of_uses_local_midnight_in_zone() {
        let range = DateRange::week_of(day(2024, 3, 4), chrono_tz::Europe::Paris).unwrap();
        assert_eq!(range.from.unwrap().to_iso(), "2024-03-04T00:00:00+01:00");
        assert_eq!(range.to.unwrap().to_iso(), "2024-03-10T23:59:59+01:00");

        // 23:30 UTC on Sunday the 3rd, but already Monday in Paris
        assert!(range.contains(&ts("2024-03-04T00:30:00+01:00")));
        assert!(!range.contains(&ts("2024-03-03T23:30:00+01:00")));
        assert!(!range.contains(&ts("2024-03-11T00:00:00+01:00")));
    }

    #[test]
    fn test_week_of_follows_dst_change() {
        // US clocks spring forward on Sunday 2024-03-10
        let range = DateRange::week_of(day(2024, 3, 6), chrono_tz::America::New_York).unwrap();
        assert_eq!(range.from.unwrap().to_iso(), "2024-03-04T00:00:00-05:00");
        assert_eq!(range.to.unwrap().to_iso(), "2024-03-10T23:59:59-04:00");

        // Sunday evening local time is past midnight UTC
        assert!(range.contains(&ts("2024-03-10T20:00:00-05:00")));
        assert!(range.contains(&ts("2024-03-04T00:00:00-05:00")));
        assert!(!range.contains(&ts("2024-03-03T23:59:59-05:00")));
    }

    #[test]
    fn test_day_start_skips_midnight_dst_gap() {
        // Santiago moved clocks from 24:00 to 01:00 into Sunday 2024-09-08
        let range = DateRange::from_args(Some("2024-09-08"), None, chrono_tz::America::Santiago)
            .unwrap();
        assert_eq!(range.from.unwrap().to_iso(), "2024-09-08T01:00:00-03:00");
    }

    #[test]
    fn test_from_args_widens_dates() {
        let range = DateRange::from_args(Some("2024-03-04"), Some("2024-03-05"), Tz::UTC).unwrap();
        assert_eq!(range.from.unwrap().to_iso(), "2024-03-04T00:00:00+00:00");
        assert_eq!(range.to.unwrap().to_iso(), "2024-03-05T23:59:59+00:00");

        let open = DateRange::from_args(None, Some("2024-03-05T12:00:00"), Tz::UTC).unwrap();
        assert!(open.from.is_none());
        assert_eq!(open.to.unwrap().to_iso(), "2024-03-05T12:00:00");

        assert!(DateRange::from_args(Some("03/04/2024"), None, Tz::UTC).is_err());
    }

    #[test]
    fn test_from_args_dates_are_local_to_zone() {
        let range =
            DateRange::from_args(Some("2024-03-04"), None, chrono_tz::Asia::Tokyo).unwrap();
        assert_eq!(range.from.unwrap().to_iso(), "2024-03-04T00:00:00+09:00");
        assert!(range.contains(&ts("2024-03-03T15:00:00")));
        assert!(!range.contains(&ts("2024-03-03T14:59:59")));
    }

    #[test]
    fn test_serde_uses_iso_strings() {
        let json = serde_json::to_string(&ts("2024-03-04T09:15:00")).unwrap();
        assert_eq!(json, "\"2024-03-04T09:15:00\"");

        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts("2024-03-04T09:15:00"));
    }
}
