//! The eight pipeline steps.
//!
//! - [`gates`]: InitializePackage, RequestPackageVersion, UpdatePackageManifest
//! - [`download`]: CreateDownloader, DownloadPackageFiles, DownloadPackageOver
//! - [`finish`]: ClearCacheBundle, StartGame

pub mod download;
pub mod finish;
pub mod gates;

pub use download::{CreateDownloader, DownloadPackageFiles, DownloadPackageOver};
pub use finish::{ClearCacheBundle, StartGame};
pub use gates::{InitializePackage, RequestPackageVersion, UpdatePackageManifest};

use super::context::{PatchContext, PatchMachine};
use crate::fsm::StateNode;
use crate::provider::{ProviderError, ProviderResult};
use hp_protocol::patch_models::{Gate, PatchStep};
use std::future::Future;
use tracing::{debug, error, warn};

/// One instance of every step, in pipeline order.
pub fn pipeline() -> Vec<Box<dyn StateNode<PatchStep, PatchContext>>> {
    vec![
        Box::new(InitializePackage),
        Box::new(RequestPackageVersion),
        Box::new(UpdatePackageManifest),
        Box::new(CreateDownloader),
        Box::new(DownloadPackageFiles),
        Box::new(DownloadPackageOver),
        Box::new(ClearCacheBundle),
        Box::new(StartGame),
    ]
}

/// Whether a completion issued by `step` still applies to the run.
///
/// A completion is stale once the run finished or moved to another step,
/// e.g. after a host retry re-entered the step before the previous attempt
/// answered.
fn is_active(machine: &PatchMachine, step: PatchStep) -> bool {
    let active = machine.data().is_running() && machine.current() == Some(step);
    if !active {
        debug!(%step, current = ?machine.current(), "ignoring stale completion");
    }
    active
}

/// Leave `gate` successfully: reset its retry counter and move to `next`.
fn pass_gate(machine: &mut PatchMachine, gate: Gate, next: PatchStep) {
    machine.data_mut().retries.reset(gate);
    // An unknown target is logged by the machine; the gate stays active.
    let _ = machine.change_state(next);
}

/// Report a failed attempt of `gate` and hold the run there until the host
/// retries it.
fn fail_gate(machine: &mut PatchMachine, gate: Gate, err: &ProviderError) {
    warn!(%gate, error = %err, "gate attempt failed");
    let data = machine.data_mut();
    data.awaiting_retry = Some(gate);
    match gate {
        Gate::Initialize => data.callbacks.initialize_failed(),
        Gate::RequestVersion => data.callbacks.version_request_failed(),
        Gate::UpdateManifest => data.callbacks.manifest_update_failed(),
    }
}

/// Run a provider call on its own task so a panic inside the provider comes
/// back as `ProviderError::NotAvailable` instead of ending the step's task.
async fn guarded<T, F>(call: F) -> ProviderResult<T>
where
    T: Send + 'static,
    F: Future<Output = ProviderResult<T>> + Send + 'static,
{
    match tokio::spawn(call).await {
        Ok(result) => result,
        Err(err) => {
            error!(error = %err, "provider call did not complete");
            Err(ProviderError::NotAvailable(format!(
                "provider call did not complete: {err}"
            )))
        }
    }
}
