//! Gate steps: each issues one provider call and either advances or reports
//! the failure to the host and waits for a retry.

use super::{fail_gate, guarded, is_active, pass_gate};
use crate::fsm::StateNode;
use crate::patch::context::{PatchContext, PatchMachine, StepContext};
use crate::patch::keys;
use hp_protocol::patch_models::{Gate, PatchStep};
use std::sync::Arc;
use tracing::info;

pub struct InitializePackage;

impl StateNode<PatchStep, PatchContext> for InitializePackage {
    fn id(&self) -> PatchStep {
        PatchStep::InitializePackage
    }

    fn on_enter(&mut self, ctx: &mut StepContext) {
        let package = ctx.data().package.clone();
        let mode = ctx.data().play_mode;
        let provider = Arc::clone(&ctx.data().provider);

        ctx.blackboard_mut().set(keys::PACKAGE_NAME, package.clone());
        ctx.blackboard_mut().set(keys::PLAY_MODE, mode);

        ctx.data_mut().awaiting_retry = None;
        info!(%package, %mode, "initializing package");
        ctx.spawn(async move {
            let result = guarded(async move { provider.initialize(mode, &package).await }).await;
            move |machine: &mut PatchMachine| {
                if !is_active(machine, PatchStep::InitializePackage) {
                    return;
                }
                match result {
                    Ok(()) => {
                        pass_gate(machine, Gate::Initialize, PatchStep::RequestPackageVersion);
                    }
                    Err(err) => fail_gate(machine, Gate::Initialize, &err),
                }
            }
        });
    }
}

pub struct RequestPackageVersion;

impl StateNode<PatchStep, PatchContext> for RequestPackageVersion {
    fn id(&self) -> PatchStep {
        PatchStep::RequestPackageVersion
    }

    fn on_enter(&mut self, ctx: &mut StepContext) {
        let package: String = ctx.blackboard().get(keys::PACKAGE_NAME);
        let provider = Arc::clone(&ctx.data().provider);

        ctx.data_mut().awaiting_retry = None;
        info!(%package, "requesting package version");
        ctx.spawn(async move {
            let result = guarded(async move { provider.request_version(&package).await }).await;
            move |machine: &mut PatchMachine| {
                if !is_active(machine, PatchStep::RequestPackageVersion) {
                    return;
                }
                match result {
                    Ok(version) => {
                        info!(%version, "resolved package version");
                        machine.set_blackboard(keys::PACKAGE_VERSION, version);
                        pass_gate(machine, Gate::RequestVersion, PatchStep::UpdatePackageManifest);
                    }
                    Err(err) => fail_gate(machine, Gate::RequestVersion, &err),
                }
            }
        });
    }
}

pub struct UpdatePackageManifest;

impl StateNode<PatchStep, PatchContext> for UpdatePackageManifest {
    fn id(&self) -> PatchStep {
        PatchStep::UpdatePackageManifest
    }

    fn on_enter(&mut self, ctx: &mut StepContext) {
        let package: String = ctx.blackboard().get(keys::PACKAGE_NAME);
        let version: String = ctx.blackboard().get(keys::PACKAGE_VERSION);
        let provider = Arc::clone(&ctx.data().provider);

        ctx.data_mut().awaiting_retry = None;
        info!(%package, %version, "updating package manifest");
        ctx.spawn(async move {
            let result =
                guarded(async move { provider.update_manifest(&package, &version).await }).await;
            move |machine: &mut PatchMachine| {
                if !is_active(machine, PatchStep::UpdatePackageManifest) {
                    return;
                }
                match result {
                    Ok(()) => {
                        pass_gate(machine, Gate::UpdateManifest, PatchStep::CreateDownloader);
                    }
                    Err(err) => fail_gate(machine, Gate::UpdateManifest, &err),
                }
            }
        });
    }
}
