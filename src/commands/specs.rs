use anyhow::Result;
use ozycal_core::Orchestrator;

use super::print_json;

pub fn run(orchestrator: &Orchestrator) -> Result<()> {
    let specs = orchestrator.specs()?;
    print_json(&specs)
}
