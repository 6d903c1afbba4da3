use anyhow::{Result, bail};
use log::debug;

use crate::dispatch::{Operation, dispatch};
use crate::host::ConsoleHost;
use crate::request::RequestOptions;

use super::{Config, build_registry, name_targets, parse_range};

/// Uninstall installed packages by name.
///
/// Returns the number of error records reported.
#[tracing::instrument(skip(config))]
pub async fn uninstall(
    names: &[String],
    version: Option<&str>,
    pass_thru: bool,
    provider: &str,
    yes: bool,
    config: Config,
) -> Result<usize> {
    // Uninstall targets must be concrete names.
    for name in names {
        if name.contains(['*', '?', '[']) {
            bail!("the name '{name}' must not contain wildcard characters");
        }
    }

    debug!("Uninstalling {names:?}");
    let registry = build_registry(&config)?;
    let mut host = ConsoleHost::new(yes);

    let options = RequestOptions {
        version: parse_range(version)?,
        source: None,
        prerelease: false,
        pass_thru,
        trust_source: false,
        path: None,
    };

    dispatch(
        &registry,
        &mut host,
        Operation::Uninstall,
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

    #[tokio::test]
    async fn test_uninstall_rejects_wildcard_names() {
        let root = TempDir::new().unwrap();
        let config = Config::for_test(root.path().to_path_buf(), Vec::new());

        let result = uninstall(&["tool*".to_string()], None, false, "", true, config).await;
        let error = result.unwrap_err();
        assert!(error.to_string().contains("wildcard"));
    }

    #[tokio::test]
    async fn test_uninstall_removes_installed_package() {
        let root = TempDir::new().unwrap();
        let tool_dir = root.path().join("tool");
        fs::create_dir_all(&tool_dir).unwrap();
        fs::write(
            tool_dir.join("1.0.0.json"),
            r#"{ "name": "tool", "version": "1.0.0" }"#,
        )
        .unwrap();

        let config = Config::for_test(root.path().to_path_buf(), Vec::new());
        let errors = uninstall(&["tool".to_string()], None, false, "", true, config)
            .await
            .unwrap();

        assert_eq!(errors, 0);
        assert!(!tool_dir.exists());
    }

    #[tokio::test]
    async fn test_uninstall_missing_package_reports_error() {
        let root = TempDir::new().unwrap();
        let config = Config::for_test(root.path().to_path_buf(), Vec::new());

        let errors = uninstall(&["absent".to_string()], None, false, "", true, config)
            .await
            .unwrap();
        assert_eq!(errors, 1);
    }
}
