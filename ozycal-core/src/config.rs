//! ozycal configuration: where datalink logs live and which datalinks exist.
//!
//! Configuration is loaded explicitly and handed to the
//! [`Orchestrator`](crate::orchestrator::Orchestrator); nothing in this crate
//! caches it globally. Hosts that want to pick up edits simply load it again.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DatalinkError, DatalinkResult};
use crate::spec::DatalinkSpec;

static DEFAULT_DATA_DIR: &str = "~/ozycal";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

/// Global configuration, by default at ~/.config/ozycal/config.toml
///
/// A `.json` file is read as JSON (the dashboard's settings format), anything
/// else as TOML.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OzycalConfig {
    #[serde(default = "default_data_dir", alias = "datapath")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub event_datalinks: Vec<DatalinkSpec>,
}

impl OzycalConfig {
    pub fn new(data_dir: impl Into<PathBuf>, event_datalinks: Vec<DatalinkSpec>) -> Self {
        OzycalConfig {
            data_dir: data_dir.into(),
            event_datalinks,
        }
    }

    pub fn config_path() -> DatalinkResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DatalinkError::Config("Could not determine config directory".into()))?
            .join("ozycal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, creating a commented-out config first
    /// if none exists yet.
    pub fn load() -> DatalinkResult<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            Self::create_default_config(&path)?;
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> DatalinkResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DatalinkError::Config(format!("Could not read {}: {e}", path.display()))
        })?;

        let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let config: OzycalConfig = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str(&content).map_err(|e| e.to_string())
        }
        .map_err(|e| DatalinkError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            datalinks = config.event_datalinks.len(),
            "loaded ozycal config"
        );

        Ok(config)
    }

    pub fn from_toml(content: &str) -> DatalinkResult<Self> {
        let config: OzycalConfig =
            toml::from_str(content).map_err(|e| DatalinkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> DatalinkResult<Self> {
        let config: OzycalConfig =
            serde_json::from_str(content).map_err(|e| DatalinkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Every spec must be well formed and names must be unique.
    pub fn validate(&self) -> DatalinkResult<()> {
        let mut seen = HashSet::new();

        for spec in &self.event_datalinks {
            spec.check().map_err(DatalinkError::Config)?;

            if !seen.insert(spec.name.as_str()) {
                return Err(DatalinkError::Config(format!(
                    "Duplicate datalink name '{}'",
                    spec.name
                )));
            }
        }

        Ok(())
    }

    /// Data root with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> DatalinkResult<()> {
        let contents = format!(
            "\
# ozycal configuration

# Where datalink logs (one .csv per datalink) live:
# data_dir = \"{}\"

# One block per datalink:
# [[event_datalinks]]
# name = \"notes\"
# calendars = [\"primary\"]
# eventTitleSourceProperty = \"text\"
#
# [event_datalinks.properties.text]
# freeform = true
#
# [event_datalinks.properties.mood]
# options = \"{{{{datapath}}}}/moods.csv\"
",
            DEFAULT_DATA_DIR
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatalinkError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| DatalinkError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
