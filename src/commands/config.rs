//! Command configuration.
//!
//! Sources come from a JSON configuration file; the install root comes
//! from the CLI, the environment, or the platform data directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::provider::SourceInfo;

/// On-disk configuration shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub sources: Vec<SourceInfo>,
}

/// Resolved configuration passed into commands.
#[derive(Debug, Clone)]
pub struct Config {
    pub install_root: PathBuf,
    pub sources: Vec<SourceInfo>,
}

impl Config {
    /// Resolve configuration from explicit paths and defaults.
    pub fn load(install_root: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.or_else(default_config_path);

        let sources = match &config_path {
            Some(path) if path.exists() => {
                debug!("Loading configuration from {}", path.display());
                let content = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let file: ConfigFile = serde_json::from_str(&content)
                    .with_context(|| format!("{} is not a valid configuration file", path.display()))?;
                file.sources
            }
            _ => Vec::new(),
        };

        let install_root = install_root
            .or_else(default_install_root)
            .context("could not determine an install root; pass --root")?;

        Ok(Self {
            install_root,
            sources,
        })
    }

    #[cfg(test)]
    pub fn for_test(install_root: PathBuf, sources: Vec<SourceInfo>) -> Self {
        Self {
            install_root,
            sources,
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("upk").join("config.json"))
}

fn default_install_root() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("upk").join("packages"))
}
