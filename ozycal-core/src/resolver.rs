//! Materializes field options that point at external files.

use std::path::{Path, PathBuf};

use crate::error::{DatalinkError, DatalinkResult};
use crate::record::PropertyValue;
use crate::spec::{DatalinkSpec, FieldOption, FieldOptions, FieldSpec, OptionSource, SourceKind};

/// Placeholder in option source paths replaced with the data root.
pub const DATAPATH_PLACEHOLDER: &str = "{{datapath}}";

pub struct SpecResolver {
    data_dir: PathBuf,
}

impl SpecResolver {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        SpecResolver {
            data_dir: data_dir.into(),
        }
    }

    /// Return copies of `specs` with every field's options inlined.
    pub fn resolve(&self, specs: &[DatalinkSpec]) -> DatalinkResult<Vec<DatalinkSpec>> {
        specs.iter().map(|spec| self.resolve_spec(spec)).collect()
    }

    pub fn resolve_spec(&self, spec: &DatalinkSpec) -> DatalinkResult<DatalinkSpec> {
        let mut resolved = spec.clone();

        for field in resolved.properties.values_mut() {
            *field = self.resolve_field(field)?;
        }

        Ok(resolved)
    }

    pub fn resolve_field(&self, field: &FieldSpec) -> DatalinkResult<FieldSpec> {
        let options = match &field.options {
            FieldOptions::Inline(_) => return Ok(field.clone()),
            FieldOptions::External(source) => self.load_source(source)?,
        };

        Ok(FieldSpec {
            options: FieldOptions::Inline(options),
            ..field.clone()
        })
    }

    /// Path of an option source with the placeholder filled in.
    pub fn source_path(&self, source: &OptionSource) -> PathBuf {
        PathBuf::from(
            source
                .path
                .replace(DATAPATH_PLACEHOLDER, &self.data_dir.to_string_lossy()),
        )
    }

    fn load_source(&self, source: &OptionSource) -> DatalinkResult<Vec<FieldOption>> {
        let path = self.source_path(source);

        let options = match source.kind {
            SourceKind::Json => load_json_options(&path)?,
            SourceKind::Csv => load_csv_options(&path)?,
        };

        tracing::debug!(path = %path.display(), count = options.len(), "loaded field options");

        Ok(options)
    }
}

fn load_json_options(path: &Path) -> DatalinkResult<Vec<FieldOption>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DatalinkError::Config(format!("Could not read options file {}: {e}", path.display()))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        DatalinkError::Config(format!("Invalid options file {}: {e}", path.display()))
    })
}

/// Each row is `value,smallText`; the value doubles as the big text.
fn load_csv_options(path: &Path) -> DatalinkResult<Vec<FieldOption>> {
    let config_err = |e: csv::Error| {
        DatalinkError::Config(format!("Invalid options file {}: {e}", path.display()))
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(config_err)?;

    let mut options = Vec::new();

    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(config_err)?;

        let (Some(value), Some(small_text)) = (row.get(0), row.get(1)) else {
            return Err(DatalinkError::Config(format!(
                "Options file {} row {} needs at least two columns",
                path.display(),
                i + 1
            )));
        };

        options.push(FieldOption {
            big_text: value.to_string(),
            small_text: small_text.to_string(),
            value: PropertyValue::String(value.to_string()),
        });
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn spec_with(field: FieldSpec) -> DatalinkSpec {
        DatalinkSpec::new(
            "mood",
            IndexMap::from([
                ("mood".to_string(), field),
                ("note".to_string(), FieldSpec::freeform()),
            ]),
        )
    }

    fn external(path: &str) -> FieldSpec {
        FieldSpec {
            options: FieldOptions::External(OptionSource::parse(path).unwrap()),
            freeform: false,
            on_create: true,
        }
    }

    #[test]
    fn test_resolve_csv_with_datapath_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("moods.csv"), "happy,:)\nsad,:(\n").unwrap();

        let resolver = SpecResolver::new(dir.path());
        let resolved = resolver
            .resolve(&[spec_with(external("{{datapath}}/moods.csv"))])
            .unwrap();

        let field = &resolved[0].properties["mood"];
        assert!(field.on_create);
        assert_eq!(
            field.options,
            FieldOptions::Inline(vec![
                FieldOption {
                    big_text: "happy".to_string(),
                    small_text: ":)".to_string(),
                    value: PropertyValue::from("happy"),
                },
                FieldOption {
                    big_text: "sad".to_string(),
                    small_text: ":(".to_string(),
                    value: PropertyValue::from("sad"),
                },
            ])
        );
    }

    #[test]
    fn test_resolve_json_options() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("moods.json"),
            r#"[{"bigText": "Great", "smallText": "top", "value": 5}]"#,
        )
        .unwrap();

        let resolver = SpecResolver::new(dir.path());
        let resolved = resolver
            .resolve(&[spec_with(external("{{datapath}}/moods.json"))])
            .unwrap();

        let options = resolved[0].properties["mood"].options.inline().unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].value, PropertyValue::from(5));
    }

    #[test]
    fn test_resolution_is_idempotent_and_leaves_input_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("moods.csv"), "happy,:)\n").unwrap();

        let resolver = SpecResolver::new(dir.path());
        let original = vec![spec_with(external("{{datapath}}/moods.csv"))];

        let once = resolver.resolve(&original).unwrap();
        let twice = resolver.resolve(&once).unwrap();

        assert_eq!(once, twice);
        assert!(original[0].properties["mood"].options.inline().is_none());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = SpecResolver::new(dir.path());

        let result = resolver.resolve(&[spec_with(external("{{datapath}}/nope.json"))]);
        assert!(matches!(result, Err(DatalinkError::Config(_))));
    }

    #[test]
    fn test_short_csv_row_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("moods.csv"), "happy,:)\nlonely\n").unwrap();

        let resolver = SpecResolver::new(dir.path());
        let err = resolver
            .resolve(&[spec_with(external("{{datapath}}/moods.csv"))])
            .unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("moods.json"), "{not json").unwrap();

        let resolver = SpecResolver::new(dir.path());
        let result = resolver.resolve(&[spec_with(external("{{datapath}}/moods.json"))]);
        assert!(matches!(result, Err(DatalinkError::Config(_))));
    }
}
