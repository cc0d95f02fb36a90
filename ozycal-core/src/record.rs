//! Datalink records: property values attached to one calendar event.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::event::CalendarEvent;

/// A scalar property value. Stored as plain text in the CSV log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Number(n.into())
    }
}

/// One datalink entry for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatalinkRecord {
    #[serde(alias = "datalink_name")]
    pub datalink_name: String,
    pub event: CalendarEvent,
    pub properties: IndexMap<String, PropertyValue>,
}

impl DatalinkRecord {
    pub fn new(
        datalink_name: impl Into<String>,
        event: CalendarEvent,
        properties: IndexMap<String, PropertyValue>,
    ) -> Self {
        DatalinkRecord {
            datalink_name: datalink_name.into(),
            event,
            properties,
        }
    }
}
