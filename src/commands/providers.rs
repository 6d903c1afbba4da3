use anyhow::Result;

use super::{Config, build_registry};

/// List registered providers and their capabilities.
#[tracing::instrument(skip(config))]
pub fn providers(config: Config) -> Result<()> {
    let registry = build_registry(&config)?;

    for info in registry.providers() {
        println!("{} ({})", info.name, info.operations);
    }

    Ok(())
}
