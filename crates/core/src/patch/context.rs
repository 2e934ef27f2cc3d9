//! Run data shared by every pipeline step.

use super::callbacks::PatchCallbacks;
use crate::fsm::{MachineContext, StateMachine};
use crate::provider::ResourcePackageProvider;
use chrono::{DateTime, Utc};
use hp_protocol::config_models::PatchSettings;
use hp_protocol::package_models::PlayMode;
use hp_protocol::patch_models::{Disposition, Gate, PatchStep, PipelineStatus, RetryCounts};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The state machine running a patch pipeline.
pub type PatchMachine = StateMachine<PatchStep, PatchContext>;

/// What a pipeline step sees from its hooks.
pub type StepContext = MachineContext<PatchStep, PatchContext>;

/// Data owned by one patch run.
pub struct PatchContext {
    pub(crate) run_id: Uuid,
    pub(crate) package: String,
    pub(crate) play_mode: PlayMode,
    pub(crate) provider: Arc<dyn ResourcePackageProvider>,
    pub(crate) settings: PatchSettings,
    pub(crate) retries: RetryCounts,
    /// Gate whose last attempt failed and which now waits for a host retry.
    pub(crate) awaiting_retry: Option<Gate>,
    pub(crate) status: PipelineStatus,
    pub(crate) disposition: Option<Disposition>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
    pub(crate) callbacks: PatchCallbacks,
}

impl PatchContext {
    pub(crate) fn new(
        package: String,
        play_mode: PlayMode,
        provider: Arc<dyn ResourcePackageProvider>,
        settings: PatchSettings,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            package,
            play_mode,
            provider,
            settings,
            retries: RetryCounts::default(),
            awaiting_retry: None,
            status: PipelineStatus::NotStarted,
            disposition: None,
            started_at: None,
            finished_at: None,
            callbacks: PatchCallbacks::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn settings(&self) -> &PatchSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.status == PipelineStatus::Running
    }
}

/// End the run with `disposition`.
///
/// Resets every retry counter and clears the blackboard. A run that is
/// already Done keeps its first disposition.
pub(crate) fn finish(ctx: &mut StepContext, disposition: Disposition) {
    let data = ctx.data_mut();
    if data.status == PipelineStatus::Done {
        debug!(run_id = %data.run_id, ?disposition, "run already finished");
        return;
    }

    data.status = PipelineStatus::Done;
    data.retries.reset_all();
    data.awaiting_retry = None;
    data.disposition = Some(disposition);
    data.finished_at = Some(Utc::now());

    if disposition.is_success() {
        info!(run_id = %data.run_id, package = %data.package, "patch run succeeded");
    } else {
        warn!(run_id = %data.run_id, package = %data.package, ?disposition, "patch run failed");
    }
    data.callbacks.finished(disposition);

    ctx.blackboard_mut().clear();
}
