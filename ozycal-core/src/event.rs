//! The calendar event a datalink record is attached to.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// Minimal view of a calendar event, as sent by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub calendar: String,
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: Timestamp,
        end: Timestamp,
        calendar: impl Into<String>,
    ) -> Self {
        CalendarEvent {
            id: id.into(),
            title: title.into(),
            start,
            end,
            calendar: calendar.into(),
        }
    }

    /// Check the event can be used as a store key: non-empty id, start <= end.
    pub fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("event id is empty".to_string());
        }

        if self.start.instant() > self.end.instant() {
            return Err(format!(
                "event '{}' ends ({}) before it starts ({})",
                self.id, self.end, self.start
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start: &str, end: &str) -> CalendarEvent {
        CalendarEvent::new(
            "e1",
            "Standup",
            Timestamp::parse(start).unwrap(),
            Timestamp::parse(end).unwrap(),
            "primary",
        )
    }

    #[test]
    fn test_well_formed_event_passes() {
        assert!(event("2024-03-04T09:00:00", "2024-03-04T09:15:00").check().is_ok());
        assert!(event("2024-03-04T09:00:00", "2024-03-04T09:00:00").check().is_ok());
    }

    #[test]
    fn test_end_before_start_fails() {
        assert!(event("2024-03-04T09:15:00", "2024-03-04T09:00:00").check().is_err());
    }

    #[test]
    fn test_empty_id_fails() {
        let mut e = event("2024-03-04T09:00:00", "2024-03-04T09:15:00");
        e.id = " ".to_string();
        assert!(e.check().is_err());
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{"id":"e1","title":"Standup","start":"2024-03-04T09:00:00","end":"2024-03-04T09:15:00","calendar":"primary"}"#;
        let parsed: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, event("2024-03-04T09:00:00", "2024-03-04T09:15:00"));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }
}
