pub mod init;
pub mod pull;
pub mod push;
pub mod specs;

use anyhow::{Context, Result};
use serde::Serialize;

/// Write a wire payload to stdout. Logs go to stderr, so stdout stays JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
