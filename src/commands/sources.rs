use anyhow::Result;

use crate::provider::Operations;

use super::{Config, build_registry};

/// List the package sources declared by source-capable providers.
#[tracing::instrument(skip(config))]
pub fn sources(provider: &str, config: Config) -> Result<()> {
    let registry = build_registry(&config)?;

    for (info, instance) in registry.resolve(provider, Operations::SOURCE) {
        for source in instance.sources() {
            let trust = if source.trusted { "trusted" } else { "untrusted" };
            println!("{} {} ({}) [{}]", source.name, source.location, trust, info.name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::provider::SourceInfo;

    #[test]
    fn test_sources_with_unmatched_provider_is_ok() {
        let root = TempDir::new().unwrap();
        let config = Config::for_test(
            root.path().to_path_buf(),
            vec![SourceInfo {
                name: "local".into(),
                location: "/repo".into(),
                trusted: false,
            }],
        );
        assert!(sources("no-such-provider", config).is_ok());
    }
}
