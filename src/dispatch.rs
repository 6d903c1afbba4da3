//! Per-command dispatch over candidate providers.
//!
//! One request is processed per target. Candidate providers are tried in
//! the registry's stable order and only the first provider to produce a
//! result is used; provider failures are reported per target and do not
//! stop the loop. Only an upstream cancellation aborts the whole
//! command.

use anyhow::Result;
use log::debug;

use crate::host::{Canceled, ErrorRecord, Host};
use crate::provider::{Operations, PackageInfo, Provider, ProviderRegistry};
use crate::request::{PackageRequest, RequestOptions};

/// The operation a command dispatches to providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Find,
    Install,
    Uninstall,
    Save,
    Publish,
}

impl Operation {
    /// Capability a provider must declare to be a candidate.
    pub fn required(self) -> Operations {
        match self {
            Operation::Find => Operations::FIND,
            Operation::Install => Operations::INSTALL,
            Operation::Uninstall => Operations::UNINSTALL,
            Operation::Save => Operations::SAVE,
            Operation::Publish => Operations::PUBLISH,
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Operation::Find => "Find",
            Operation::Install => "Install",
            Operation::Uninstall => "Uninstall",
            Operation::Save => "Save",
            Operation::Publish => "Publish",
        }
    }

    /// Whether the action is confirmed with the caller before any
    /// provider is invoked.
    fn confirms(self) -> bool {
        !matches!(self, Operation::Find)
    }

    /// Whether a name target addresses packages by name, excluding
    /// providers that only support path-based addressing.
    fn addresses_by_name(self) -> bool {
        matches!(self, Operation::Find | Operation::Install)
    }

    /// Operation-specific request shaping.
    fn shape(self, request: &mut PackageRequest<'_>) {
        match self {
            // Find always emits its matches.
            Operation::Find => request.set_pass_thru(true),
            // Uninstall matches installed prereleases regardless of the
            // caller's flag.
            Operation::Uninstall => request.set_prerelease(true),
            _ => {}
        }
    }
}

/// One user-specified identity to process.
#[derive(Debug, Clone)]
pub enum Target {
    /// A package name, possibly containing wildcard characters.
    Name(String),
    /// A previously emitted package; dispatch goes back to the provider
    /// that produced it.
    Package(PackageInfo),
}

impl Target {
    fn display_name(&self) -> &str {
        match self {
            Target::Name(name) => name,
            Target::Package(package) => &package.name,
        }
    }
}

/// Run `operation` for every target.
///
/// Non-fatal errors are reported through the host's error sink; the
/// returned error is only ever an upstream cancellation.
#[tracing::instrument(skip(registry, host, targets, options))]
pub async fn dispatch(
    registry: &ProviderRegistry,
    host: &mut dyn Host,
    operation: Operation,
    targets: Vec<Target>,
    options: RequestOptions,
    provider_filter: &str,
) -> Result<()> {
    let named_candidates = registry.resolve(provider_filter, operation.required());

    for target in targets {
        let candidates = match &target {
            Target::Name(_) if operation.addresses_by_name() => named_candidates
                .iter()
                .filter(|(info, _)| info.package_by_name)
                .cloned()
                .collect(),
            Target::Name(_) => named_candidates.clone(),
            // A package target goes back to its own provider.
            Target::Package(package) => registry.resolve(&package.provider, operation.required()),
        };

        let requested_name = target.display_name().to_string();

        if operation.confirms() && !host.should_process(operation.verb(), &requested_name) {
            continue;
        }

        let mut request = match target {
            Target::Name(name) => PackageRequest::from_name(&mut *host, &name, options.clone()),
            Target::Package(package) => {
                PackageRequest::from_package(&mut *host, package, options.clone())
            }
        };
        operation.shape(&mut request);

        debug!("{} '{}' package.", operation.verb(), request.name());

        for (info, instance) in &candidates {
            debug!("Calling '{}' provider.", info.name);
            request.set_provider(info.clone());

            if let Err(error) = invoke(instance.as_ref(), operation, &mut request).await {
                if is_canceled(&error) {
                    return Err(error);
                }
                request.write_error(ErrorRecord::provider_error(&requested_name, &error));
            }

            // Only the first provider to produce a result is used.
            if request.has_write_object() {
                break;
            }
        }

        if !request.has_write_object() {
            request.write_error(ErrorRecord::not_found(&requested_name));
        }
    }

    Ok(())
}

async fn invoke(
    provider: &dyn Provider,
    operation: Operation,
    request: &mut PackageRequest<'_>,
) -> Result<()> {
    match operation {
        Operation::Find => provider.find_package(request).await,
        Operation::Install => provider.install_package(request).await,
        Operation::Uninstall => provider.uninstall_package(request).await,
        Operation::Save => provider.save_package(request).await,
        Operation::Publish => provider.publish_package(request).await,
    }
}

fn is_canceled(error: &anyhow::Error) -> bool {
    error.is::<Canceled>() || error.chain().any(|cause| cause.is::<Canceled>())
}
