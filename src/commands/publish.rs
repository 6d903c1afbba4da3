use std::path::PathBuf;

use anyhow::Result;
use log::debug;

use crate::dispatch::{Operation, Target, dispatch};
use crate::host::ConsoleHost;
use crate::request::RequestOptions;

use super::{Config, build_registry};

/// Publish a package manifest to a source.
///
/// Returns the number of error records reported.
#[tracing::instrument(skip(config))]
pub async fn publish(
    path: PathBuf,
    source: Option<&str>,
    pass_thru: bool,
    provider: &str,
    yes: bool,
    config: Config,
) -> Result<usize> {
    debug!("Publishing {}", path.display());
    let registry = build_registry(&config)?;
    let mut host = ConsoleHost::new(yes);

    // Errors are attributed to the path being published.
    let target = Target::Name(path.display().to_string());

    let options = RequestOptions {
        version: None,
        source: source.map(str::to_string),
        prerelease: false,
        pass_thru,
        trust_source: false,
        path: Some(path),
    };

    dispatch(
        &registry,
        &mut host,
        Operation::Publish,
        vec![target],
        options,
        provider,
    )
    .await?;

    Ok(host.error_count())
}
