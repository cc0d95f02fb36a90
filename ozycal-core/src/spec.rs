//! Datalink schema types.
//!
//! A [`DatalinkSpec`] describes one datalink: which calendars it applies to and
//! the closed, ordered set of properties recorded for each event. Field options
//! are either listed inline or loaded from an external JSON/CSV file by the
//! [`SpecResolver`](crate::resolver::SpecResolver).

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::record::PropertyValue;

/// Columns every store file starts with, before the spec's properties.
pub const BASE_COLUMNS: [&str; 5] = ["sequenceId", "start", "end", "calendar", "eventId"];

/// A selectable choice for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub big_text: String,
    pub small_text: String,
    pub value: PropertyValue,
}

/// File format of an external option source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Json,
    Csv,
}

/// Path to a file holding a field's options. May contain `{{datapath}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSource {
    pub path: String,
    pub kind: SourceKind,
}

impl OptionSource {
    pub fn parse(path: &str) -> Result<Self, String> {
        let lower = path.to_ascii_lowercase();

        let kind = if lower.ends_with(".json") {
            SourceKind::Json
        } else if lower.ends_with(".csv") {
            SourceKind::Csv
        } else {
            return Err(format!(
                "Option source '{}' must be a .json or .csv file",
                path
            ));
        };

        Ok(OptionSource {
            path: path.to_string(),
            kind,
        })
    }
}

/// Options for a field: a materialized list, or a file still to be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldOptions", into = "RawFieldOptions")]
pub enum FieldOptions {
    Inline(Vec<FieldOption>),
    External(OptionSource),
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions::Inline(Vec::new())
    }
}

impl FieldOptions {
    /// The materialized options, or None if the source is still external.
    pub fn inline(&self) -> Option<&[FieldOption]> {
        match self {
            FieldOptions::Inline(options) => Some(options),
            FieldOptions::External(_) => None,
        }
    }
}

/// Configuration form of [`FieldOptions`]: a list or a path string.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawFieldOptions {
    List(Vec<FieldOption>),
    Path(String),
}

impl TryFrom<RawFieldOptions> for FieldOptions {
    type Error = String;

    fn try_from(raw: RawFieldOptions) -> Result<Self, Self::Error> {
        match raw {
            RawFieldOptions::List(options) => Ok(FieldOptions::Inline(options)),
            RawFieldOptions::Path(path) => OptionSource::parse(&path).map(FieldOptions::External),
        }
    }
}

impl From<FieldOptions> for RawFieldOptions {
    fn from(options: FieldOptions) -> Self {
        match options {
            FieldOptions::Inline(options) => RawFieldOptions::List(options),
            FieldOptions::External(source) => RawFieldOptions::Path(source.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    #[serde(default)]
    pub options: FieldOptions,
    #[serde(default)]
    pub freeform: bool,
    #[serde(default)]
    pub on_create: bool,
}

impl FieldSpec {
    pub fn freeform() -> Self {
        FieldSpec {
            freeform: true,
            ..Default::default()
        }
    }

    pub fn with_options(options: Vec<FieldOption>) -> Self {
        FieldSpec {
            options: FieldOptions::Inline(options),
            ..Default::default()
        }
    }
}

/// Schema for one datalink. `name` identifies its store file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatalinkSpec {
    pub name: String,
    #[serde(default)]
    pub calendars: IndexSet<String>,
    #[serde(default)]
    pub event_title_source_property: Option<String>,
    pub properties: IndexMap<String, FieldSpec>,
}

impl DatalinkSpec {
    pub fn new(name: impl Into<String>, properties: IndexMap<String, FieldSpec>) -> Self {
        DatalinkSpec {
            name: name.into(),
            calendars: IndexSet::new(),
            event_title_source_property: None,
            properties,
        }
    }

    /// Declared property names, in declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Header row of the store file.
    pub fn header(&self) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.properties.keys().cloned())
            .collect()
    }

    /// Check the invariants a spec must hold before a store can use it.
    pub fn check(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("datalink name is empty".to_string());
        }

        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(format!(
                "datalink name '{}' cannot be used as a file name",
                self.name
            ));
        }

        if let Some(column) = self
            .properties
            .keys()
            .find(|p| BASE_COLUMNS.contains(&p.as_str()))
        {
            return Err(format!(
                "datalink '{}' declares reserved property '{}'",
                self.name, column
            ));
        }

        if let Some(title) = &self.event_title_source_property {
            if !self.properties.contains_key(title) {
                return Err(format!(
                    "datalink '{}' takes event titles from undeclared property '{}'",
                    self.name, title
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_options_become_external_source() {
        let field: FieldSpec =
            serde_json::from_str(r#"{"options": "{{datapath}}/moods.csv"}"#).unwrap();

        assert_eq!(
            field.options,
            FieldOptions::External(OptionSource {
                path: "{{datapath}}/moods.csv".to_string(),
                kind: SourceKind::Csv,
            })
        );
        assert!(!field.freeform);
        assert!(!field.on_create);
    }

    #[test]
    fn test_unknown_source_suffix_is_rejected() {
        let result: Result<FieldSpec, _> =
            serde_json::from_str(r#"{"options": "/data/moods.txt"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_inline_options_with_mixed_values() {
        let field: FieldSpec = serde_json::from_str(
            r#"{
                "options": [
                    {"bigText": "Great", "smallText": "5", "value": 5},
                    {"bigText": "Yes", "smallText": "", "value": true},
                    {"bigText": "Meh", "smallText": "", "value": "meh"}
                ],
                "onCreate": true
            }"#,
        )
        .unwrap();

        let options = field.options.inline().unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].value, PropertyValue::from(5));
        assert_eq!(options[1].value, PropertyValue::Bool(true));
        assert_eq!(options[2].value, PropertyValue::String("meh".to_string()));
        assert!(field.on_create);
    }

    #[test]
    fn test_missing_options_default_to_empty_list() {
        let field: FieldSpec = serde_json::from_str(r#"{"freeform": true}"#).unwrap();
        assert_eq!(field.options, FieldOptions::Inline(vec![]));
    }

    #[test]
    fn test_header_follows_declaration_order() {
        let spec: DatalinkSpec = serde_json::from_str(
            r#"{"name": "log", "calendars": ["primary"], "properties": {"zeta": {}, "alpha": {}}}"#,
        )
        .unwrap();

        assert_eq!(
            spec.header(),
            vec!["sequenceId", "start", "end", "calendar", "eventId", "zeta", "alpha"]
        );
    }

    #[test]
    fn test_check_rejects_bad_title_source() {
        let mut spec = DatalinkSpec::new(
            "notes",
            IndexMap::from([("text".to_string(), FieldSpec::freeform())]),
        );
        assert!(spec.check().is_ok());

        spec.event_title_source_property = Some("missing".to_string());
        assert!(spec.check().is_err());
    }

    #[test]
    fn test_check_rejects_path_like_names_and_reserved_columns() {
        let spec = DatalinkSpec::new("../notes", IndexMap::new());
        assert!(spec.check().is_err());

        let spec = DatalinkSpec::new(
            "notes",
            IndexMap::from([("eventId".to_string(), FieldSpec::freeform())]),
        );
        assert!(spec.check().is_err());
    }
}
