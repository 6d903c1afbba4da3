//! Provider abstraction for package ecosystems.
//!
//! A provider implements one ecosystem's package operations behind a
//! single trait; the registry resolves providers by name pattern and
//! declared capability.

mod filesystem;
mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;

use anyhow::{Result, bail};
use async_trait::async_trait;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::request::PackageRequest;
use crate::version::VersionRange;

pub use filesystem::FileSystemProvider;
pub use registry::ProviderRegistry;

/// Capability set declared by a provider at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Operations(u8);

impl Operations {
    pub const NONE: Operations = Operations(0);
    pub const FIND: Operations = Operations(1);
    pub const INSTALL: Operations = Operations(1 << 1);
    pub const UNINSTALL: Operations = Operations(1 << 2);
    pub const SAVE: Operations = Operations(1 << 3);
    pub const PUBLISH: Operations = Operations(1 << 4);
    pub const SOURCE: Operations = Operations(1 << 5);

    /// Whether every operation in `other` is present in `self`.
    pub const fn contains(self, other: Operations) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Operations {
    type Output = Operations;

    fn bitor(self, rhs: Operations) -> Operations {
        Operations(self.0 | rhs.0)
    }
}

impl fmt::Display for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = [
            (Operations::FIND, "find"),
            (Operations::INSTALL, "install"),
            (Operations::UNINSTALL, "uninstall"),
            (Operations::SAVE, "save"),
            (Operations::PUBLISH, "publish"),
            (Operations::SOURCE, "source"),
        ];
        let mut first = true;
        for (operation, label) in labels {
            if self.contains(operation) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(label)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Opaque provider identity assigned by the registry.
///
/// Keys the per-provider trusted-source cache, so two providers never
/// share a source namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(u64);

impl ProviderId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Registration record describing a provider instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub name: String,
    pub operations: Operations,
    pub file_extensions: Vec<String>,
    pub uri_schemes: Vec<String>,
    /// Whether name-based addressing is meaningful for this provider.
    /// Providers that only address packages by path set this to false.
    pub package_by_name: bool,
}

/// A package dependency by name and optional version constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionRange>,
}

/// A package produced by a provider through the request's emission
/// methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub description: String,
    /// Name of the provider that produced this package.
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        write!(f, " [{}]", self.provider)
    }
}

/// A package source known to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub trusted: bool,
}

/// A pluggable package provider.
///
/// Operations interact with the core only through the request passed to
/// them; a provider must not retain the request beyond the call. The
/// registry's capability filter keeps unsupported operations from being
/// invoked, so their default bodies just report the gap.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name used for resolution and attribution.
    fn name(&self) -> &str;

    /// Declared capability set, validated at registration time.
    fn operations(&self) -> Operations;

    /// File extensions this provider is associated with.
    fn file_extensions(&self) -> Vec<String> {
        Vec::new()
    }

    /// Uri schemes this provider is associated with.
    fn uri_schemes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether name-based addressing is meaningful for this provider.
    fn package_by_name(&self) -> bool {
        true
    }

    async fn find_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        let _ = request;
        unsupported(self.name(), "find")
    }

    async fn install_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        let _ = request;
        unsupported(self.name(), "install")
    }

    async fn uninstall_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        let _ = request;
        unsupported(self.name(), "uninstall")
    }

    async fn save_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        let _ = request;
        unsupported(self.name(), "save")
    }

    async fn publish_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        let _ = request;
        unsupported(self.name(), "publish")
    }

    /// Sources this provider knows about, for providers with the
    /// `SOURCE` capability.
    fn sources(&self) -> Vec<SourceInfo> {
        Vec::new()
    }
}

fn unsupported(provider: &str, operation: &str) -> Result<()> {
    bail!("the '{provider}' provider does not support the '{operation}' operation")
}
