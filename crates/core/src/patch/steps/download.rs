//! Download steps: size up the pending files, wait for the host to confirm,
//! then transfer them while relaying progress and per-file errors.

use super::{guarded, is_active};
use crate::fsm::{Notifier, StateNode};
use crate::patch::context::{PatchContext, PatchMachine, StepContext};
use crate::patch::keys;
use crate::provider::PackageDownloader;
use hp_protocol::ipc::DownloadEvent;
use hp_protocol::patch_models::PatchStep;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct CreateDownloader;

impl StateNode<PatchStep, PatchContext> for CreateDownloader {
    fn id(&self) -> PatchStep {
        PatchStep::CreateDownloader
    }

    fn on_enter(&mut self, ctx: &mut StepContext) {
        let package: String = ctx.blackboard().get(keys::PACKAGE_NAME);
        let settings = ctx.data().settings;
        let downloader = ctx.data().provider.create_downloader(
            &package,
            settings.download_concurrency,
            settings.download_retries_per_file,
        );

        let total_count = downloader.total_count();
        let total_bytes = downloader.total_bytes();
        if total_count == 0 {
            info!(%package, "package is up to date, nothing to download");
            ctx.change_state(PatchStep::StartGame);
            return;
        }

        info!(%package, total_count, total_bytes, "found files to download");
        ctx.blackboard_mut().set(keys::DOWNLOADER, downloader);
        ctx.data_mut()
            .callbacks
            .found_update_files(total_count, total_bytes);
    }
}

pub struct DownloadPackageFiles;

impl StateNode<PatchStep, PatchContext> for DownloadPackageFiles {
    fn id(&self) -> PatchStep {
        PatchStep::DownloadPackageFiles
    }

    fn on_enter(&mut self, ctx: &mut StepContext) {
        let Some(downloader) = ctx
            .blackboard()
            .try_get::<Arc<dyn PackageDownloader>>(keys::DOWNLOADER)
        else {
            error!("no downloader was created for this run");
            ctx.data_mut()
                .callbacks
                .download_failed("no downloader was created for this run");
            return;
        };

        info!(
            total_count = downloader.total_count(),
            total_bytes = downloader.total_bytes(),
            "downloading package files"
        );
        let notifier = ctx.notifier();
        ctx.spawn(async move {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let transfer = guarded(async move { downloader.begin(tx).await });
            tokio::pin!(transfer);

            let result = loop {
                tokio::select! {
                    biased;
                    Some(event) = rx.recv() => relay(&notifier, event),
                    result = &mut transfer => break result,
                }
            };
            while let Ok(event) = rx.try_recv() {
                relay(&notifier, event);
            }

            move |machine: &mut PatchMachine| {
                if !is_active(machine, PatchStep::DownloadPackageFiles) {
                    return;
                }
                match result {
                    Ok(()) => {
                        info!("package files downloaded");
                        let _ = machine.change_state(PatchStep::DownloadPackageOver);
                    }
                    Err(err) => {
                        warn!(error = %err, "package download failed");
                        machine
                            .data_mut()
                            .callbacks
                            .download_failed(&err.to_string());
                    }
                }
            }
        });
    }
}

/// Hand a downloader event to the host callbacks on the machine's call chain.
fn relay(notifier: &Notifier<PatchStep, PatchContext>, event: DownloadEvent) {
    notifier.post(move |machine: &mut PatchMachine| {
        let callbacks = &mut machine.data_mut().callbacks;
        match event {
            DownloadEvent::Progress(progress) => callbacks.download_progress(progress),
            DownloadEvent::FileError { file_name, error } => {
                warn!(file = %file_name, %error, "file download failed");
                callbacks.download_error(&file_name, &error);
            }
        }
    });
}

pub struct DownloadPackageOver;

impl StateNode<PatchStep, PatchContext> for DownloadPackageOver {
    fn id(&self) -> PatchStep {
        PatchStep::DownloadPackageOver
    }

    fn on_enter(&mut self, ctx: &mut StepContext) {
        ctx.blackboard_mut().remove(keys::DOWNLOADER);
        ctx.change_state(PatchStep::ClearCacheBundle);
    }
}
