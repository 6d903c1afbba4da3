//! The per-target request context shared with providers.
//!
//! One request is built per target and reused across every candidate
//! provider tried for that target. Providers interact with the core only
//! through the request: match predicates, package emission, and the
//! untrusted-source prompt.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Result;
use glob::{MatchOptions, Pattern};
use semver::Version;

use crate::host::{ErrorRecord, Host, PromptChoice};
use crate::provider::{Dependency, PackageInfo, ProviderId, ProviderInfo};
use crate::version::VersionRange;

/// Caller-supplied fields shared by every target of one invocation.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub version: Option<VersionRange>,
    pub source: Option<String>,
    pub prerelease: bool,
    pub pass_thru: bool,
    /// Skip untrusted-source prompting entirely.
    pub trust_source: bool,
    /// Destination path for save, package path for publish.
    pub path: Option<PathBuf>,
}

/// Context for one find/install/uninstall/save/publish target.
///
/// Mutable by the dispatcher that owns it; providers receive it for the
/// duration of a single operation call. `has_write_object` latches true
/// on the first emission and is the only signal the dispatcher reads to
/// detect that a provider produced a result.
pub struct PackageRequest<'a> {
    name: String,
    version: Option<VersionRange>,
    source: Option<String>,
    prerelease: bool,
    package: Option<PackageInfo>,
    path: Option<PathBuf>,
    pass_thru: bool,
    trust_source: bool,
    /// Active provider identity; dispatcher-owned, set immediately
    /// before each provider invocation.
    provider: Option<ProviderInfo>,
    has_write_object: bool,
    trusted_repositories: HashMap<ProviderId, Vec<String>>,
    yes_to_all: bool,
    no_to_all: bool,
    host: &'a mut dyn Host,
}

impl<'a> PackageRequest<'a> {
    /// Build a request for a name target.
    pub fn from_name(host: &'a mut dyn Host, name: &str, options: RequestOptions) -> Self {
        Self {
            name: name.to_string(),
            version: options.version,
            source: options.source,
            prerelease: options.prerelease,
            package: None,
            path: options.path,
            pass_thru: options.pass_thru,
            trust_source: options.trust_source,
            provider: None,
            has_write_object: false,
            trusted_repositories: HashMap::new(),
            yes_to_all: false,
            no_to_all: false,
            host,
        }
    }

    /// Build a request from a previously emitted package.
    ///
    /// The package already encodes its name and version, so no version
    /// constraint is set; providers use the package directly.
    pub fn from_package(
        host: &'a mut dyn Host,
        package: PackageInfo,
        options: RequestOptions,
    ) -> Self {
        let name = package.name.clone();
        let mut request = Self::from_name(host, &name, options);
        request.version = None;
        request.source = package.source.clone();
        request.package = Some(package);
        request
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&VersionRange> {
        self.version.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn prerelease(&self) -> bool {
        self.prerelease
    }

    /// The pre-resolved package, when the request was built from one.
    pub fn package(&self) -> Option<&PackageInfo> {
        self.package.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn provider(&self) -> Option<&ProviderInfo> {
        self.provider.as_ref()
    }

    /// Whether any provider has emitted a package for this request.
    pub fn has_write_object(&self) -> bool {
        self.has_write_object
    }

    pub(crate) fn set_provider(&mut self, info: ProviderInfo) {
        self.provider = Some(info);
    }

    pub(crate) fn set_prerelease(&mut self, prerelease: bool) {
        self.prerelease = prerelease;
    }

    pub(crate) fn set_pass_thru(&mut self, pass_thru: bool) {
        self.pass_thru = pass_thru;
    }

    pub(crate) fn write_error(&mut self, record: ErrorRecord) {
        self.host.write_error(record);
    }

    /// Case-insensitive wildcard match of `name` against the request's
    /// name pattern.
    pub fn is_match_name(&self, name: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::default()
        };
        match Pattern::new(&self.name) {
            Ok(pattern) => pattern.matches_with(name, options),
            // Not a well-formed pattern; compare literally.
            Err(_) => self.name.eq_ignore_ascii_case(name),
        }
    }

    /// Whether `version` matches the request's version constraint.
    ///
    /// Prereleases never match unless the prerelease flag is set. With
    /// no constraint configured this returns false for every version;
    /// "any version of this name" goes through the name predicate alone.
    pub fn is_match_version(&self, version: &Version) -> bool {
        if !version.pre.is_empty() && !self.prerelease {
            return false;
        }
        match &self.version {
            Some(range) => range.satisfies(version),
            None => false,
        }
    }

    /// Combined name and version predicate for catalog filtering.
    pub fn is_match(&self, name: &str, version: &Version) -> bool {
        self.is_match_name(name) && self.is_match_version(version)
    }

    /// Build a package attributed to the active provider.
    pub fn new_package_info(
        &self,
        name: &str,
        version: Version,
        description: &str,
        source: Option<&str>,
        metadata: BTreeMap<String, String>,
        dependencies: Vec<Dependency>,
    ) -> PackageInfo {
        PackageInfo {
            name: name.to_string(),
            version,
            description: description.to_string(),
            provider: self
                .provider
                .as_ref()
                .map(|info| info.name.clone())
                .unwrap_or_default(),
            source: source.map(String::from),
            metadata,
            dependencies,
        }
    }

    /// Report a package for this request.
    ///
    /// Latches `has_write_object`; the package is forwarded to the
    /// caller only when pass-thru is set.
    pub fn write_package(&mut self, package: PackageInfo) {
        self.has_write_object = true;

        if self.pass_thru {
            self.host.write_package(package);
        }
    }

    /// Report several packages, emitting each one.
    pub fn write_packages(&mut self, packages: impl IntoIterator<Item = PackageInfo>) {
        for package in packages {
            self.write_package(package);
        }
    }

    /// Ask whether to proceed with an untrusted source.
    ///
    /// Returns the decision; a `false` return means the provider must
    /// not act on this source. Sticky "to all" answers and per-provider
    /// accepted sources short-circuit later prompts within the same
    /// invocation.
    pub fn prompt_untrusted_source(&mut self, source: &str) -> Result<bool> {
        if self.trust_source {
            return Ok(true);
        }
        if self.yes_to_all {
            return Ok(true);
        }
        if self.no_to_all {
            return Ok(false);
        }

        if let Some(info) = &self.provider {
            // First use of a provider initializes its cache entry.
            let trusted = self.trusted_repositories.entry(info.id).or_default();
            if trusted.iter().any(|s| s.eq_ignore_ascii_case(source)) {
                return Ok(true);
            }
        }

        let query = format!(
            "You are installing packages from an untrusted source. If you \
             trust this source, mark it as trusted in the configuration. \
             Are you sure you want to continue with '{source}'?"
        );

        let choice = self
            .host
            .prompt_for_choice("Untrusted source", &query, true)?;

        match choice {
            PromptChoice::YesToAll => self.yes_to_all = true,
            PromptChoice::NoToAll => self.no_to_all = true,
            _ => {}
        }

        let accepted = matches!(choice, PromptChoice::Yes | PromptChoice::YesToAll);

        if accepted && let Some(info) = &self.provider {
            self.trusted_repositories
                .entry(info.id)
                .or_default()
                .push(source.to_string());
        }

        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Canceled, MockHost};
    use crate::provider::Operations;
    use crate::version::parse_version;

    fn provider_info(id: u64, name: &str) -> ProviderInfo {
        ProviderInfo {
            id: ProviderId::new(id),
            name: name.to_string(),
            operations: Operations::FIND,
            file_extensions: Vec::new(),
            uri_schemes: Vec::new(),
            package_by_name: true,
        }
    }

    fn options_with_range(text: &str) -> RequestOptions {
        RequestOptions {
            version: Some(VersionRange::parse(text).unwrap()),
            ..RequestOptions::default()
        }
    }

    #[test]
    fn test_name_match_honors_wildcards() {
        let mut host = MockHost::new();
        let request = PackageRequest::from_name(&mut host, "foo*", RequestOptions::default());
        assert!(request.is_match_name("foobar"));
        assert!(request.is_match_name("foo"));
        assert!(!request.is_match_name("barfoo"));
    }

    #[test]
    fn test_name_match_is_case_insensitive() {
        let mut host = MockHost::new();
        let request = PackageRequest::from_name(&mut host, "Foo?", RequestOptions::default());
        assert!(request.is_match_name("fOOd"));
        assert!(!request.is_match_name("food-truck"));
    }

    #[test]
    fn test_version_match_without_constraint_is_false() {
        let mut host = MockHost::new();
        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        assert!(!request.is_match_version(&parse_version("1.0.0").unwrap()));

        request.set_prerelease(true);
        assert!(!request.is_match_version(&parse_version("1.0.0-beta").unwrap()));
        assert!(!request.is_match_version(&parse_version("0.0.1").unwrap()));
    }

    #[test]
    fn test_version_match_rejects_prerelease_without_flag() {
        let mut host = MockHost::new();
        let request = PackageRequest::from_name(&mut host, "foo", options_with_range("[1.0,2.0)"));
        // In range, but a prerelease.
        assert!(!request.is_match_version(&parse_version("1.5.0-rc.1").unwrap()));
        assert!(request.is_match_version(&parse_version("1.5.0").unwrap()));
    }

    #[test]
    fn test_version_match_allows_prerelease_with_flag() {
        let mut host = MockHost::new();
        let mut options = options_with_range("[1.0,2.0)");
        options.prerelease = true;
        let request = PackageRequest::from_name(&mut host, "foo", options);
        assert!(request.is_match_version(&parse_version("1.5.0-rc.1").unwrap()));
    }

    #[test]
    fn test_combined_match_requires_both() {
        let mut host = MockHost::new();
        let request = PackageRequest::from_name(&mut host, "foo*", options_with_range("1.0.0"));
        let version = parse_version("1.0.0").unwrap();
        assert!(request.is_match("foobar", &version));
        assert!(!request.is_match("other", &version));
        assert!(!request.is_match("foobar", &parse_version("2.0.0").unwrap()));
    }

    #[test]
    fn test_write_package_latches_has_write_object() {
        let mut host = MockHost::new();
        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        assert!(!request.has_write_object());

        let package = request.new_package_info(
            "foo",
            parse_version("1.0.0").unwrap(),
            "",
            None,
            BTreeMap::new(),
            Vec::new(),
        );
        request.write_package(package);
        assert!(request.has_write_object());
    }

    #[test]
    fn test_write_package_without_pass_thru_does_not_emit() {
        let mut host = MockHost::new();
        host.expect_write_package().never();

        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        let package = request.new_package_info(
            "foo",
            parse_version("1.0.0").unwrap(),
            "",
            None,
            BTreeMap::new(),
            Vec::new(),
        );
        request.write_package(package);
        assert!(request.has_write_object());
    }

    #[test]
    fn test_write_package_with_pass_thru_emits() {
        let mut host = MockHost::new();
        host.expect_write_package().times(1).return_const(());

        let options = RequestOptions {
            pass_thru: true,
            ..RequestOptions::default()
        };
        let mut request = PackageRequest::from_name(&mut host, "foo", options);
        let package = request.new_package_info(
            "foo",
            parse_version("1.0.0").unwrap(),
            "",
            None,
            BTreeMap::new(),
            Vec::new(),
        );
        request.write_package(package);
    }

    #[test]
    fn test_write_packages_emits_each_item() {
        let mut host = MockHost::new();
        host.expect_write_package().times(3).return_const(());

        let options = RequestOptions {
            pass_thru: true,
            ..RequestOptions::default()
        };
        let mut request = PackageRequest::from_name(&mut host, "foo", options);
        let packages: Vec<_> = (0..3)
            .map(|patch| {
                request.new_package_info(
                    "foo",
                    Version::new(1, 0, patch),
                    "",
                    None,
                    BTreeMap::new(),
                    Vec::new(),
                )
            })
            .collect();

        request.write_packages(packages);
        assert!(request.has_write_object());
    }

    #[test]
    fn test_new_package_info_stamps_active_provider() {
        let mut host = MockHost::new();
        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        request.set_provider(provider_info(1, "filesystem"));

        let package = request.new_package_info(
            "foo",
            parse_version("1.0.0").unwrap(),
            "desc",
            Some("local"),
            BTreeMap::new(),
            Vec::new(),
        );
        assert_eq!(package.provider, "filesystem");
        assert_eq!(package.source.as_deref(), Some("local"));
    }

    #[test]
    fn test_trust_source_skips_prompting() {
        let mut host = MockHost::new();
        host.expect_prompt_for_choice().never();

        let options = RequestOptions {
            trust_source: true,
            ..RequestOptions::default()
        };
        let mut request = PackageRequest::from_name(&mut host, "foo", options);
        assert!(request.prompt_untrusted_source("anything").unwrap());
    }

    #[test]
    fn test_yes_to_all_is_sticky_across_sources() {
        let mut host = MockHost::new();
        host.expect_prompt_for_choice()
            .times(1)
            .returning(|_, _, _| Ok(PromptChoice::YesToAll));

        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        request.set_provider(provider_info(1, "a"));

        assert!(request.prompt_untrusted_source("first").unwrap());
        // Different source, no further prompt.
        assert!(request.prompt_untrusted_source("second").unwrap());
    }

    #[test]
    fn test_no_to_all_is_sticky_across_sources() {
        let mut host = MockHost::new();
        host.expect_prompt_for_choice()
            .times(1)
            .returning(|_, _, _| Ok(PromptChoice::NoToAll));

        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        request.set_provider(provider_info(1, "a"));

        assert!(!request.prompt_untrusted_source("first").unwrap());
        assert!(!request.prompt_untrusted_source("second").unwrap());
    }

    #[test]
    fn test_accepted_source_is_cached_per_provider() {
        let mut host = MockHost::new();
        // One prompt for provider P, one for provider Q.
        host.expect_prompt_for_choice()
            .times(2)
            .returning(|_, _, _| Ok(PromptChoice::Yes));

        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());

        request.set_provider(provider_info(1, "p"));
        assert!(request.prompt_untrusted_source("shared").unwrap());
        // Cached for (P, shared); no prompt.
        assert!(request.prompt_untrusted_source("shared").unwrap());

        // Q has its own source namespace and prompts again.
        request.set_provider(provider_info(2, "q"));
        assert!(request.prompt_untrusted_source("shared").unwrap());
    }

    #[test]
    fn test_cached_source_lookup_is_case_insensitive() {
        let mut host = MockHost::new();
        host.expect_prompt_for_choice()
            .times(1)
            .returning(|_, _, _| Ok(PromptChoice::Yes));

        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        request.set_provider(provider_info(1, "p"));

        assert!(request.prompt_untrusted_source("MySource").unwrap());
        assert!(request.prompt_untrusted_source("mysource").unwrap());
    }

    #[test]
    fn test_rejected_source_prompts_again() {
        let mut host = MockHost::new();
        host.expect_prompt_for_choice()
            .times(2)
            .returning(|_, _, _| Ok(PromptChoice::No));

        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        request.set_provider(provider_info(1, "p"));

        // A plain "no" is not sticky and is not cached.
        assert!(!request.prompt_untrusted_source("src").unwrap());
        assert!(!request.prompt_untrusted_source("src").unwrap());
    }

    #[test]
    fn test_prompt_without_provider_identity_does_not_cache() {
        let mut host = MockHost::new();
        host.expect_prompt_for_choice()
            .times(2)
            .returning(|_, _, _| Ok(PromptChoice::Yes));

        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        assert!(request.prompt_untrusted_source("src").unwrap());
        assert!(request.prompt_untrusted_source("src").unwrap());
    }

    #[test]
    fn test_prompt_cancellation_propagates() {
        let mut host = MockHost::new();
        host.expect_prompt_for_choice()
            .times(1)
            .returning(|_, _, _| Err(Canceled.into()));

        let mut request = PackageRequest::from_name(&mut host, "foo", RequestOptions::default());
        let error = request.prompt_untrusted_source("src").unwrap_err();
        assert!(error.is::<Canceled>());
    }

    #[test]
    fn test_from_package_carries_package_and_drops_constraint() {
        let mut host = MockHost::new();
        let package = PackageInfo {
            name: "tool".into(),
            version: Version::new(1, 0, 0),
            description: String::new(),
            provider: "filesystem".into(),
            source: Some("local".into()),
            metadata: BTreeMap::new(),
            dependencies: Vec::new(),
        };

        let options = options_with_range("2.0.0");
        let request = PackageRequest::from_package(&mut host, package.clone(), options);
        assert_eq!(request.name(), "tool");
        assert!(request.version().is_none());
        assert_eq!(request.source(), Some("local"));
        assert_eq!(request.package(), Some(&package));
    }
}
