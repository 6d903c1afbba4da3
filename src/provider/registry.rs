//! Provider registration and resolution.
//!
//! Providers are validated when registered and resolved by name pattern
//! plus required capability. Registration order is preserved so the
//! dispatch loop's "first provider that produces output wins" policy is
//! reproducible across runs.

use std::sync::Arc;

use anyhow::{Result, bail};
use glob::{MatchOptions, Pattern};
use log::debug;

use super::{Operations, Provider, ProviderId, ProviderInfo};

/// Characters not allowed in a provider name.
const INVALID_NAME_CHARACTERS: [char; 6] = [':', '\\', '[', ']', '?', '*'];

/// Ordered collection of registered providers.
pub struct ProviderRegistry {
    providers: Vec<(ProviderInfo, Arc<dyn Provider>)>,
    next_id: u64,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a provider, validating its declaration.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<ProviderInfo> {
        let name = provider.name();

        if name.trim().is_empty() {
            bail!("the provider name cannot be empty");
        }
        if name.contains(INVALID_NAME_CHARACTERS) {
            bail!("the provider name '{name}' contains invalid characters");
        }
        if provider.operations().is_empty() {
            bail!("the '{name}' provider declares no supported operations");
        }
        if self
            .providers
            .iter()
            .any(|(info, _)| info.name.eq_ignore_ascii_case(name))
        {
            bail!("a provider named '{name}' is already registered");
        }

        let info = ProviderInfo {
            id: ProviderId::new(self.next_id),
            name: name.to_string(),
            operations: provider.operations(),
            file_extensions: provider.file_extensions(),
            uri_schemes: provider.uri_schemes(),
            package_by_name: provider.package_by_name(),
        };
        self.next_id += 1;

        debug!("Registered provider '{}' ({})", info.name, info.operations);
        self.providers.push((info.clone(), provider));
        Ok(info)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// All registered providers in registration order.
    pub fn providers(&self) -> impl Iterator<Item = &ProviderInfo> {
        self.providers.iter().map(|(info, _)| info)
    }

    /// All registered instances with their registration records.
    pub fn instances(&self) -> impl Iterator<Item = (&ProviderInfo, &Arc<dyn Provider>)> {
        self.providers.iter().map(|(info, provider)| (info, provider))
    }

    /// Resolve the candidate providers for a name pattern and required
    /// capability, in registration order.
    ///
    /// An empty pattern selects every provider with the capability. An
    /// empty result is not an error at this layer; the dispatch loop
    /// surfaces it as "package not found".
    pub fn resolve(
        &self,
        name_pattern: &str,
        required: Operations,
    ) -> Vec<(ProviderInfo, Arc<dyn Provider>)> {
        self.providers
            .iter()
            .filter(|(info, _)| info.operations.contains(required))
            .filter(|(info, _)| name_matches(name_pattern, &info.name))
            .map(|(info, provider)| (info.clone(), Arc::clone(provider)))
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn name_matches(pattern: &str, name: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return true;
    }

    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::default()
    };
    match Pattern::new(pattern) {
        Ok(pattern) => pattern.matches_with(name, options),
        Err(_) => pattern.eq_ignore_ascii_case(name),
    }
}
