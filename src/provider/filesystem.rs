//! Filesystem repository provider.
//!
//! A source is a directory of JSON package manifests; the install root
//! records installed packages as `<root>/<name>/<version>.json`. This is
//! the reference provider for the dispatch core and is useful on its own
//! for directory-based package repositories.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, warn};
use semver::Version;
use serde::{Deserialize, Serialize};

use super::{Dependency, Operations, Provider, SourceInfo};
use crate::request::PackageRequest;

/// A package manifest stored in a repository directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

/// Provider backed by directories of JSON manifests.
pub struct FileSystemProvider {
    sources: Vec<SourceInfo>,
    install_root: PathBuf,
}

impl FileSystemProvider {
    pub const NAME: &'static str = "filesystem";

    pub fn new(sources: Vec<SourceInfo>, install_root: PathBuf) -> Self {
        Self {
            sources,
            install_root,
        }
    }

    /// Sources relevant to the request, honoring its source filter.
    fn sources_for(&self, request: &PackageRequest<'_>) -> Vec<&SourceInfo> {
        match request.source() {
            Some(name) => self
                .sources
                .iter()
                .filter(|source| source.name.eq_ignore_ascii_case(name))
                .collect(),
            None => self.sources.iter().collect(),
        }
    }

    /// Read every manifest in a directory, skipping unreadable files.
    fn scan(dir: &Path) -> Result<Vec<Manifest>> {
        let mut manifests = Vec::new();
        if !dir.is_dir() {
            debug!("Source directory {} does not exist", dir.display());
            return Ok(manifests);
        }

        for entry in fs::read_dir(dir)
            .with_context(|| format!("failed to read directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_manifest(&path) {
                Ok(manifest) => manifests.push(manifest),
                Err(error) => {
                    warn!("Skipping unreadable manifest {}: {error:#}", path.display());
                }
            }
        }

        manifests.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        Ok(manifests)
    }

    /// The best (highest-version) matching manifest across sources,
    /// with the source it came from.
    fn best_candidate(
        &self,
        request: &PackageRequest<'_>,
    ) -> Result<Option<(Manifest, &SourceInfo)>> {
        let mut best: Option<(Manifest, &SourceInfo)> = None;
        for source in self.sources_for(request) {
            for manifest in Self::scan(Path::new(&source.location))? {
                if !manifest_matches(request, &manifest) {
                    continue;
                }
                if best
                    .as_ref()
                    .is_none_or(|(current, _)| manifest.version > current.version)
                {
                    best = Some((manifest, source));
                }
            }
        }
        Ok(best)
    }

}

#[async_trait]
impl Provider for FileSystemProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn operations(&self) -> Operations {
        Operations::FIND
            | Operations::INSTALL
            | Operations::UNINSTALL
            | Operations::SAVE
            | Operations::PUBLISH
            | Operations::SOURCE
    }

    fn file_extensions(&self) -> Vec<String> {
        vec![".json".to_string()]
    }

    fn uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    async fn find_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        let mut found = Vec::new();
        for source in self.sources_for(request) {
            for manifest in Self::scan(Path::new(&source.location))? {
                if manifest_matches(request, &manifest) {
                    found.push(request.new_package_info(
                        &manifest.name,
                        manifest.version.clone(),
                        &manifest.description,
                        Some(&source.name),
                        manifest.metadata,
                        manifest.dependencies,
                    ));
                }
            }
        }

        request.write_packages(found);
        Ok(())
    }

    async fn install_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        let Some((manifest, source)) = self.best_candidate(request)? else {
            return Ok(());
        };

        if !source.trusted && !request.prompt_untrusted_source(&source.name)? {
            debug!("Source '{}' was not accepted; skipping install", source.name);
            return Ok(());
        }

        let dir = self.install_root.join(&manifest.name);
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(format!("{}.json", manifest.version));
        write_manifest(&path, &manifest)?;
        debug!("Installed {} {} to {}", manifest.name, manifest.version, path.display());

        let package = request.new_package_info(
            &manifest.name,
            manifest.version.clone(),
            &manifest.description,
            Some(&source.name),
            manifest.metadata,
            manifest.dependencies,
        );
        request.write_package(package);
        Ok(())
    }

    async fn uninstall_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        if !self.install_root.is_dir() {
            return Ok(());
        }

        let mut removed = Vec::new();
        for entry in fs::read_dir(&self.install_root)? {
            let package_dir = entry?.path();
            if !package_dir.is_dir() {
                continue;
            }

            for version_entry in fs::read_dir(&package_dir)? {
                let path = version_entry?.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }
                let manifest = match read_manifest(&path) {
                    Ok(manifest) => manifest,
                    Err(error) => {
                        warn!("Skipping unreadable manifest {}: {error:#}", path.display());
                        continue;
                    }
                };
                if !manifest_matches(request, &manifest) {
                    continue;
                }

                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
                removed.push(request.new_package_info(
                    &manifest.name,
                    manifest.version.clone(),
                    &manifest.description,
                    None,
                    manifest.metadata,
                    manifest.dependencies,
                ));
            }

            // Drop the package directory once its last version is gone.
            if fs::read_dir(&package_dir)?.next().is_none() {
                let _ = fs::remove_dir(&package_dir);
            }
        }

        request.write_packages(removed);
        Ok(())
    }

    async fn save_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        let Some(destination) = request.path().map(Path::to_path_buf) else {
            bail!("a destination path is required to save a package");
        };

        let Some((manifest, source)) = self.best_candidate(request)? else {
            return Ok(());
        };

        if !source.trusted && !request.prompt_untrusted_source(&source.name)? {
            debug!("Source '{}' was not accepted; skipping save", source.name);
            return Ok(());
        }

        let path = if destination.is_dir() {
            destination.join(format!("{}-{}.json", manifest.name, manifest.version))
        } else {
            destination
        };
        write_manifest(&path, &manifest)?;
        debug!("Saved {} {} to {}", manifest.name, manifest.version, path.display());

        let package = request.new_package_info(
            &manifest.name,
            manifest.version.clone(),
            &manifest.description,
            Some(&source.name),
            manifest.metadata,
            manifest.dependencies,
        );
        request.write_package(package);
        Ok(())
    }

    async fn publish_package(&self, request: &mut PackageRequest<'_>) -> Result<()> {
        let Some(path) = request.path().map(Path::to_path_buf) else {
            bail!("a package manifest path is required to publish");
        };
        let manifest = read_manifest(&path)?;

        let source = match request.source() {
            Some(name) => self
                .sources
                .iter()
                .find(|source| source.name.eq_ignore_ascii_case(name))
                .with_context(|| format!("no source named '{name}' is configured"))?,
            None => self
                .sources
                .first()
                .context("no package sources are configured")?,
        };

        let dir = Path::new(&source.location);
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let target = dir.join(format!("{}-{}.json", manifest.name, manifest.version));
        write_manifest(&target, &manifest)?;
        debug!(
            "Published {} {} to source '{}'",
            manifest.name, manifest.version, source.name
        );

        let package = request.new_package_info(
            &manifest.name,
            manifest.version.clone(),
            &manifest.description,
            Some(&source.name),
            manifest.metadata,
            manifest.dependencies,
        );
        request.write_package(package);
        Ok(())
    }

    fn sources(&self) -> Vec<SourceInfo> {
        self.sources.clone()
    }
}

/// Whether a manifest satisfies the request.
///
/// A pre-resolved package target matches by exact identity. Otherwise
/// prereleases require the prerelease flag, and a request without a
/// version constraint matches on name alone.
fn manifest_matches(request: &PackageRequest<'_>, manifest: &Manifest) -> bool {
    if let Some(package) = request.package() {
        return manifest.name.eq_ignore_ascii_case(&package.name)
            && manifest.version == package.version;
    }

    if !manifest.version.pre.is_empty() && !request.prerelease() {
        return false;
    }

    if request.version().is_some() {
        request.is_match(&manifest.name, &manifest.version)
    } else {
        request.is_match_name(&manifest.name)
    }
}

fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid package manifest", path.display()))
}

fn write_manifest(path: &Path, manifest: &Manifest) -> Result<()> {
    let content = serde_json::to_string_pretty(manifest)?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
