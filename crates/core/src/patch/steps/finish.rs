//! Closing steps: prune the cache, then end the run successfully.

use super::{guarded, is_active};
use crate::fsm::StateNode;
use crate::patch::context::{finish, PatchContext, PatchMachine, StepContext};
use crate::patch::keys;
use hp_protocol::patch_models::{Disposition, PatchStep};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ClearCacheBundle;

impl StateNode<PatchStep, PatchContext> for ClearCacheBundle {
    fn id(&self) -> PatchStep {
        PatchStep::ClearCacheBundle
    }

    fn on_enter(&mut self, ctx: &mut StepContext) {
        let package: String = ctx.blackboard().get(keys::PACKAGE_NAME);
        let provider = Arc::clone(&ctx.data().provider);

        info!(%package, "clearing unused cache");
        ctx.spawn(async move {
            let result = guarded(async move { provider.clear_unused_cache(&package).await }).await;
            move |machine: &mut PatchMachine| {
                if !is_active(machine, PatchStep::ClearCacheBundle) {
                    return;
                }
                if let Err(err) = result {
                    // Stale cache entries only cost disk space.
                    warn!(error = %err, "clearing unused cache failed");
                }
                let _ = machine.change_state(PatchStep::StartGame);
            }
        });
    }
}

pub struct StartGame;

impl StateNode<PatchStep, PatchContext> for StartGame {
    fn id(&self) -> PatchStep {
        PatchStep::StartGame
    }

    fn on_enter(&mut self, ctx: &mut StepContext) {
        finish(ctx, Disposition::Succeeded);
    }
}
