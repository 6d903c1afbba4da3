use anyhow::Result;
use log::debug;

use crate::dispatch::{Operation, dispatch};
use crate::host::ConsoleHost;
use crate::request::RequestOptions;

use super::{Config, build_registry, name_targets, parse_range};

/// Install packages from configured sources.
///
/// Returns the number of error records reported.
#[tracing::instrument(skip(config))]
#[allow(clippy::too_many_arguments)]
pub async fn install(
    names: &[String],
    version: Option<&str>,
    source: Option<&str>,
    prerelease: bool,
    trust_source: bool,
    pass_thru: bool,
    provider: &str,
    yes: bool,
    config: Config,
) -> Result<usize> {
    debug!("Installing {names:?}");
    let registry = build_registry(&config)?;
    let mut host = ConsoleHost::new(yes);

    let options = RequestOptions {
        version: parse_range(version)?,
        source: source.map(str::to_string),
        prerelease,
        pass_thru,
        trust_source,
        path: None,
    };

    dispatch(
        &registry,
        &mut host,
        Operation::Install,
        name_targets(names),
        options,
        provider,
    )
    .await?;

    Ok(host.error_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::provider::SourceInfo;

    #[tokio::test]
    async fn test_install_records_package_under_root() {
        let repo = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        fs::write(
            repo.path().join("tool-1.2.0.json"),
            r#"{ "name": "tool", "version": "1.2.0" }"#,
        )
        .unwrap();

        let config = Config::for_test(
            root.path().to_path_buf(),
            vec![SourceInfo {
                name: "local".into(),
                location: repo.path().display().to_string(),
                trusted: true,
            }],
        );

        let errors = install(
            &["tool".to_string()],
            None,
            None,
            false,
            false,
            false,
            "",
            true,
            config,
        )
        .await
        .unwrap();

        assert_eq!(errors, 0);
        assert!(root.path().join("tool").join("1.2.0.json").exists());
    }
}
