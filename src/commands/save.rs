use std::path::PathBuf;

use anyhow::Result;
use log::debug;

use crate::dispatch::{Operation, dispatch};
use crate::host::ConsoleHost;
use crate::request::RequestOptions;

use super::{Config, build_registry, name_targets, parse_range};

/// Save packages to a directory without installing them.
///
/// Returns the number of error records reported.
#[tracing::instrument(skip(config))]
#[allow(clippy::too_many_arguments)]
pub async fn save(
    names: &[String],
    path: PathBuf,
    version: Option<&str>,
    source: Option<&str>,
    prerelease: bool,
    trust_source: bool,
    pass_thru: bool,
    provider: &str,
    yes: bool,
    config: Config,
) -> Result<usize> {
    debug!("Saving {names:?} to {}", path.display());
    let registry = build_registry(&config)?;
    let mut host = ConsoleHost::new(yes);

    let options = RequestOptions {
        version: parse_range(version)?,
        source: source.map(str::to_string),
        prerelease,
        pass_thru,
        trust_source,
        path: Some(path),
    };

    dispatch(
        &registry,
        &mut host,
        Operation::Save,
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
    async fn test_save_copies_manifest_to_destination() {
        let repo = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(
            repo.path().join("tool-1.0.0.json"),
            r#"{ "name": "tool", "version": "1.0.0" }"#,
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

        let errors = save(
            &["tool".to_string()],
            dest.path().to_path_buf(),
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
        assert!(dest.path().join("tool-1.0.0.json").exists());
    }
}
