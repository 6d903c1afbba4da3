use anyhow::Result;
use log::debug;

use crate::dispatch::{Operation, dispatch};
use crate::host::ConsoleHost;
use crate::request::RequestOptions;

use super::{Config, build_registry, name_targets, parse_range};

/// Find packages available from configured sources.
///
/// Returns the number of error records reported.
#[tracing::instrument(skip(config))]
pub async fn find(
    names: &[String],
    version: Option<&str>,
    source: Option<&str>,
    prerelease: bool,
    provider: &str,
    config: Config,
) -> Result<usize> {
    debug!("Finding {names:?}");
    let registry = build_registry(&config)?;
    let mut host = ConsoleHost::new(true);

    let options = RequestOptions {
        version: parse_range(version)?,
        source: source.map(str::to_string),
        prerelease,
        pass_thru: true,
        trust_source: false,
        path: None,
    };

    dispatch(
        &registry,
        &mut host,
        Operation::Find,
        name_targets(names),
        options,
        provider,
    )
    .await?;

    Ok(host.error_count())
}
