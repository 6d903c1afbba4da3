//! Command layer binding CLI arguments to the dispatch core.

mod config;
mod find;
mod install;
mod providers;
mod publish;
mod save;
mod sources;
mod uninstall;

pub use config::{Config, ConfigFile};
pub use find::find;
pub use install::install;
pub use providers::providers;
pub use publish::publish;
pub use save::save;
pub use sources::sources;
pub use uninstall::uninstall;

use std::sync::Arc;

use anyhow::Result;

use crate::dispatch::Target;
use crate::provider::{FileSystemProvider, ProviderRegistry};
use crate::version::VersionRange;

/// Build the provider registry for one invocation.
pub(crate) fn build_registry(config: &Config) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(FileSystemProvider::new(
        config.sources.clone(),
        config.install_root.clone(),
    )))?;
    Ok(registry)
}

/// Parse optional version-range text; malformed text terminates the
/// command before any target is processed.
pub(crate) fn parse_range(text: Option<&str>) -> Result<Option<VersionRange>> {
    text.map(VersionRange::parse).transpose()
}

pub(crate) fn name_targets(names: &[String]) -> Vec<Target> {
    names.iter().cloned().map(Target::Name).collect()
}
