use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use ozycal_core::{DatalinkRecord, Orchestrator};

use super::print_json;

pub fn run(orchestrator: &Orchestrator, file: Option<&Path>) -> Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read records from stdin")?;
            buf
        }
    };

    let records: Vec<DatalinkRecord> =
        serde_json::from_str(&input).context("Failed to parse datalink records")?;

    let failed = orchestrator.push_many(records);
    print_json(&failed)?;

    if !failed.is_empty() {
        anyhow::bail!("Some datalinks failed to push: {}", failed.join(", "));
    }

    Ok(())
}
