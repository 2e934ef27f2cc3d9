//! The patch pipeline orchestrator.

use super::callbacks::PatchCallbacks;
use super::context::{finish, PatchContext, PatchMachine};
use super::error::PatchError;
use super::keys;
use super::steps;
use crate::fsm::Blackboard;
use crate::provider::ResourcePackageProvider;
use chrono::Utc;
use hp_protocol::config_models::PatchSettings;
use hp_protocol::ipc::PatchEvent;
use hp_protocol::package_models::PlayMode;
use hp_protocol::patch_models::{
    Disposition, Gate, PatchReport, PatchStep, PipelineStatus, RetryCounts,
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Drives one package through the patch pipeline.
///
/// The operation never blocks. Steps start provider calls and return; the
/// host applies their results by calling [`tick`](Self::tick) once per
/// control cycle, or awaits them with [`run_until_idle`](Self::run_until_idle).
/// Whenever the run waits on the host (a gate failed, files were found, the
/// download failed) one of the callbacks tells it which `user_*` action
/// resumes the run.
pub struct PatchOperation {
    machine: PatchMachine,
}

impl PatchOperation {
    pub fn new(
        package: impl Into<String>,
        play_mode: PlayMode,
        provider: Arc<dyn ResourcePackageProvider>,
    ) -> Self {
        Self::with_settings(package, play_mode, provider, PatchSettings::default())
    }

    pub fn with_settings(
        package: impl Into<String>,
        play_mode: PlayMode,
        provider: Arc<dyn ResourcePackageProvider>,
        settings: PatchSettings,
    ) -> Self {
        let context = PatchContext::new(package.into(), play_mode, provider, settings);
        let mut machine = PatchMachine::new(context);

        for step in steps::pipeline() {
            if let Err(err) = machine.add_boxed_node(step) {
                error!(error = %err, "failed to register pipeline step");
            }
        }

        machine.set_state_observer(|data: &mut PatchContext, step, previous| {
            debug!(run_id = %data.run_id, %step, %previous, "patch step changed");
            data.callbacks.step_changed(step, Some(previous));
        });

        Self { machine }
    }

    /// Host callbacks. Handlers may be installed before or during the run.
    pub fn callbacks_mut(&mut self) -> &mut PatchCallbacks {
        &mut self.machine.data_mut().callbacks
    }

    /// Replace every callback with one that sends a [`PatchEvent`] on `tx`.
    pub fn forward_events(&mut self, tx: UnboundedSender<PatchEvent>) {
        let run_id = self.run_id();
        self.machine.data_mut().callbacks = PatchCallbacks::forwarding(run_id, tx);
    }

    /// Enter InitializePackage and start the run.
    ///
    /// Must be called from within a Tokio runtime, since the first step
    /// spawns its provider call right away.
    ///
    /// # Errors
    ///
    /// Returns `PatchError::AlreadyStarted` if the run was started before.
    pub fn start(&mut self) -> Result<(), PatchError> {
        let data = self.machine.data_mut();
        if data.status != PipelineStatus::NotStarted {
            return Err(PatchError::AlreadyStarted);
        }

        data.status = PipelineStatus::Running;
        data.started_at = Some(Utc::now());
        info!(
            run_id = %data.run_id,
            package = %data.package,
            play_mode = %data.play_mode,
            "patch run started"
        );
        data.callbacks.step_changed(PatchStep::InitializePackage, None);

        if let Err(err) = self.machine.run(PatchStep::InitializePackage) {
            let data = self.machine.data_mut();
            data.status = PipelineStatus::NotStarted;
            data.started_at = None;
            return Err(err.into());
        }
        Ok(())
    }

    /// Apply provider results that arrived since the last tick, then update
    /// the active step. Returns how many results were applied.
    pub fn tick(&mut self) -> usize {
        if !self.is_running() {
            return 0;
        }

        let handled = self.machine.dispatch_ready();
        if self.is_running() {
            self.machine.update();
        }
        handled
    }

    /// Apply provider results as they arrive until no provider call is in
    /// flight, i.e. until the run is done or waits on the host.
    pub async fn run_until_idle(&mut self) {
        while self.is_running() && self.machine.next_completion().await {}
    }

    /// Retry InitializePackage after `on_initialize_failed`.
    ///
    /// Gate retries are accepted only while the run sits on that gate and
    /// its last attempt failed. Anything else is logged and ignored, and the
    /// retry counter is left alone.
    pub fn user_retry_initialize(&mut self) {
        self.retry_gate(Gate::Initialize);
    }

    /// Retry RequestPackageVersion after `on_version_request_failed`.
    pub fn user_retry_request_version(&mut self) {
        self.retry_gate(Gate::RequestVersion);
    }

    /// Retry UpdatePackageManifest after `on_manifest_update_failed`.
    pub fn user_retry_update_manifest(&mut self) {
        self.retry_gate(Gate::UpdateManifest);
    }

    /// Confirm the download announced by `on_found_update_files`.
    pub fn user_begin_download(&mut self) {
        if !self.accepts_action("begin download") {
            return;
        }
        if self.current_step() != Some(PatchStep::CreateDownloader)
            || !self.machine.context().blackboard().contains(keys::DOWNLOADER)
        {
            warn!(
                current = ?self.current_step(),
                "begin download ignored, no download is pending"
            );
            return;
        }

        info!(run_id = %self.run_id(), "host confirmed download");
        self.change_step(PatchStep::DownloadPackageFiles);
    }

    /// Start over from CreateDownloader after `on_download_failed`.
    ///
    /// The new downloader announces itself through `on_found_update_files`
    /// again, so the host confirms the remaining download once more.
    pub fn user_retry_download(&mut self) {
        if !self.accepts_action("retry download") {
            return;
        }
        if self.current_step() != Some(PatchStep::DownloadPackageFiles)
            || self.machine.in_flight() > 0
        {
            warn!(
                current = ?self.current_step(),
                in_flight = self.machine.in_flight(),
                "retry download ignored, no failed download to retry"
            );
            return;
        }

        info!(run_id = %self.run_id(), "retrying download");
        self.change_step(PatchStep::CreateDownloader);
    }

    /// End the run with `disposition`. A finished run keeps its first
    /// disposition.
    pub fn finish(&mut self, disposition: Disposition) {
        finish(self.machine.context_mut(), disposition);
    }

    /// Give up on the run.
    ///
    /// Provider calls already running keep running; their results are
    /// dropped.
    pub fn abort(&mut self) {
        if self.is_done() {
            warn!(run_id = %self.run_id(), "abort ignored, run already finished");
            return;
        }

        let discarded = self.machine.discard_pending();
        debug!(run_id = %self.run_id(), discarded, "discarded pending completions");
        self.finish(Disposition::Aborted);
    }

    pub fn status(&self) -> PipelineStatus {
        self.machine.data().status
    }

    /// `None` until the run is Done.
    pub fn disposition(&self) -> Option<Disposition> {
        self.machine.data().disposition
    }

    pub fn is_done(&self) -> bool {
        self.status() == PipelineStatus::Done
    }

    pub fn is_running(&self) -> bool {
        self.machine.data().is_running()
    }

    pub fn current_step(&self) -> Option<PatchStep> {
        self.machine.current()
    }

    pub fn retry_counts(&self) -> RetryCounts {
        self.machine.data().retries
    }

    /// The gate whose last attempt failed, while the run waits for the host
    /// to retry it.
    pub fn awaiting_retry(&self) -> Option<Gate> {
        self.machine.data().awaiting_retry
    }

    pub fn run_id(&self) -> Uuid {
        self.machine.data().run_id
    }

    pub fn package(&self) -> &str {
        self.machine.data().package()
    }

    pub fn settings(&self) -> &PatchSettings {
        self.machine.data().settings()
    }

    /// Data the steps shared so far. Empty once the run is Done.
    pub fn blackboard(&self) -> &Blackboard {
        self.machine.context().blackboard()
    }

    pub fn report(&self) -> PatchReport {
        let data = self.machine.data();
        PatchReport {
            run_id: data.run_id,
            package: data.package.clone(),
            status: data.status,
            current_step: self.machine.current(),
            disposition: data.disposition,
            retries: data.retries,
            started_at: data.started_at,
            finished_at: data.finished_at,
        }
    }

    fn retry_gate(&mut self, gate: Gate) {
        if !self.accepts_action("retry") {
            return;
        }

        let current = self.current_step();
        if current != Some(gate.step()) || self.awaiting_retry() != Some(gate) {
            warn!(
                run_id = %self.run_id(),
                %gate,
                ?current,
                "retry ignored, gate has no failed attempt"
            );
            return;
        }

        let data = self.machine.data_mut();
        data.awaiting_retry = None;
        let attempts = data.retries.bump(gate);
        let max = data.settings.max_gate_retries;
        if attempts > max {
            error!(
                run_id = %data.run_id,
                %gate,
                attempts,
                max,
                "retry limit exceeded, giving up"
            );
            self.finish(Disposition::RetryExhausted(gate));
            return;
        }

        info!(run_id = %data.run_id, %gate, attempts, max, "retrying gate");
        self.change_step(gate.step());
    }

    fn change_step(&mut self, step: PatchStep) {
        // Unregistered steps are logged by the machine.
        if let Err(err) = self.machine.change_state(step) {
            warn!(error = %err, %step, "step change rejected");
        }
    }

    fn accepts_action(&self, action: &str) -> bool {
        if self.is_running() {
            return true;
        }
        warn!(
            run_id = %self.run_id(),
            action,
            status = ?self.status(),
            "host action ignored, run is not active"
        );
        false
    }
}
