use anyhow::Result;
use ozycal_core::store::DatalinkStore;
use ozycal_core::{Orchestrator, OzycalConfig};

pub fn run(orchestrator: &Orchestrator, config: &OzycalConfig) -> Result<()> {
    if config.event_datalinks.is_empty() {
        anyhow::bail!(
            "No datalinks configured.\n\n\
            Add an [[event_datalinks]] block to your config file first."
        );
    }

    orchestrator.init_stores()?;

    let data_path = config.data_path();
    for spec in &config.event_datalinks {
        let path = DatalinkStore::path_for(&data_path, &spec.name);
        println!("{:<16} {}", spec.name, path.display());
    }

    Ok(())
}
