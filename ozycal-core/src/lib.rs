//! Event datalinks for ozycal.
//!
//! A datalink attaches structured properties to calendar events. This crate
//! provides:
//! - `spec` / `resolver`: datalink schemas and loading of external field options
//! - `store`: the CSV log backing each datalink
//! - `orchestrator`: pull by time range and push with per-datalink failure reporting

pub mod config;
pub mod error;
pub mod event;
pub mod orchestrator;
pub mod record;
pub mod resolver;
pub mod spec;
pub mod store;
pub mod timestamp;

pub use config::OzycalConfig;
pub use error::{DatalinkError, DatalinkResult};
pub use event::CalendarEvent;
pub use orchestrator::Orchestrator;
pub use record::{DatalinkRecord, PropertyValue};
pub use spec::{DatalinkSpec, FieldOption, FieldOptions, FieldSpec};
pub use timestamp::{DateRange, Timestamp};
