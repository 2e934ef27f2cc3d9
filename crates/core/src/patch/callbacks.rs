//! Host-facing callbacks of a patch run.
//!
//! Each callback is a single settable handler: setting it again replaces the
//! previous handler. Handlers run on the call chain that drives the
//! operation (`tick` or `run_until_idle`), never concurrently.

use hp_protocol::ipc::{DownloadProgress, PatchEvent};
use hp_protocol::patch_models::{Disposition, PatchStep};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

type Handler0 = Box<dyn FnMut() + Send>;
type Handler<A> = Box<dyn FnMut(A) + Send>;
type Handler2<A, B> = Box<dyn FnMut(A, B) + Send>;

#[derive(Default)]
pub struct PatchCallbacks {
    initialize_failed: Option<Handler0>,
    version_request_failed: Option<Handler0>,
    manifest_update_failed: Option<Handler0>,
    found_update_files: Option<Handler2<u32, u64>>,
    download_progress: Option<Handler<DownloadProgress>>,
    download_error: Option<Box<dyn FnMut(&str, &str) + Send>>,
    download_failed: Option<Box<dyn FnMut(&str) + Send>>,
    step_changed: Option<Handler2<PatchStep, Option<PatchStep>>>,
    finished: Option<Handler<Disposition>>,
}

impl PatchCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks that forward every notification as a [`PatchEvent`].
    ///
    /// Events are dropped silently once the receiver is gone.
    pub fn forwarding(run_id: Uuid, tx: UnboundedSender<PatchEvent>) -> Self {
        let mut callbacks = Self::new();

        let sender = tx.clone();
        callbacks.on_initialize_failed(move || {
            let _ = sender.send(PatchEvent::InitializeFailed { run_id });
        });

        let sender = tx.clone();
        callbacks.on_version_request_failed(move || {
            let _ = sender.send(PatchEvent::VersionRequestFailed { run_id });
        });

        let sender = tx.clone();
        callbacks.on_manifest_update_failed(move || {
            let _ = sender.send(PatchEvent::ManifestUpdateFailed { run_id });
        });

        let sender = tx.clone();
        callbacks.on_found_update_files(move |total_count, total_bytes| {
            let _ = sender.send(PatchEvent::FoundUpdateFiles {
                run_id,
                total_count,
                total_bytes,
            });
        });

        let sender = tx.clone();
        callbacks.on_download_progress(move |progress| {
            let _ = sender.send(PatchEvent::DownloadProgress { run_id, progress });
        });

        let sender = tx.clone();
        callbacks.on_download_error(move |file_name, error| {
            let _ = sender.send(PatchEvent::DownloadError {
                run_id,
                file_name: file_name.to_string(),
                error: error.to_string(),
            });
        });

        let sender = tx.clone();
        callbacks.on_download_failed(move |reason| {
            let _ = sender.send(PatchEvent::DownloadFailed {
                run_id,
                reason: reason.to_string(),
            });
        });

        let sender = tx.clone();
        callbacks.on_step_changed(move |step, previous| {
            let _ = sender.send(PatchEvent::StepChanged {
                run_id,
                step,
                previous,
            });
        });

        callbacks.on_finished(move |disposition| {
            let _ = tx.send(PatchEvent::Finished {
                run_id,
                disposition,
            });
        });

        callbacks
    }

    /// Fired once per failed initialize attempt.
    pub fn on_initialize_failed<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut() + Send + 'static,
    {
        self.initialize_failed = Some(Box::new(handler));
        self
    }

    /// Fired once per failed version request.
    pub fn on_version_request_failed<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut() + Send + 'static,
    {
        self.version_request_failed = Some(Box::new(handler));
        self
    }

    /// Fired once per failed manifest update.
    pub fn on_manifest_update_failed<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut() + Send + 'static,
    {
        self.manifest_update_failed = Some(Box::new(handler));
        self
    }

    /// Fired with `(count, bytes)` when files are pending download. The run
    /// then waits for `user_begin_download`.
    pub fn on_found_update_files<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(u32, u64) + Send + 'static,
    {
        self.found_update_files = Some(Box::new(handler));
        self
    }

    pub fn on_download_progress<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(DownloadProgress) + Send + 'static,
    {
        self.download_progress = Some(Box::new(handler));
        self
    }

    /// Fired with `(file_name, error)` per failed file transfer.
    pub fn on_download_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&str, &str) + Send + 'static,
    {
        self.download_error = Some(Box::new(handler));
        self
    }

    /// Fired when the download as a whole fails. The run then waits for
    /// `user_retry_download`.
    pub fn on_download_failed<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.download_failed = Some(Box::new(handler));
        self
    }

    /// Fired with `(step, previous)` whenever the active step changes.
    pub fn on_step_changed<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(PatchStep, Option<PatchStep>) + Send + 'static,
    {
        self.step_changed = Some(Box::new(handler));
        self
    }

    pub fn on_finished<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(Disposition) + Send + 'static,
    {
        self.finished = Some(Box::new(handler));
        self
    }

    pub(crate) fn initialize_failed(&mut self) {
        if let Some(handler) = self.initialize_failed.as_mut() {
            handler();
        }
    }

    pub(crate) fn version_request_failed(&mut self) {
        if let Some(handler) = self.version_request_failed.as_mut() {
            handler();
        }
    }

    pub(crate) fn manifest_update_failed(&mut self) {
        if let Some(handler) = self.manifest_update_failed.as_mut() {
            handler();
        }
    }

    pub(crate) fn found_update_files(&mut self, total_count: u32, total_bytes: u64) {
        if let Some(handler) = self.found_update_files.as_mut() {
            handler(total_count, total_bytes);
        }
    }

    pub(crate) fn download_progress(&mut self, progress: DownloadProgress) {
        if let Some(handler) = self.download_progress.as_mut() {
            handler(progress);
        }
    }

    pub(crate) fn download_error(&mut self, file_name: &str, error: &str) {
        if let Some(handler) = self.download_error.as_mut() {
            handler(file_name, error);
        }
    }

    pub(crate) fn download_failed(&mut self, reason: &str) {
        if let Some(handler) = self.download_failed.as_mut() {
            handler(reason);
        }
    }

    pub(crate) fn step_changed(&mut self, step: PatchStep, previous: Option<PatchStep>) {
        if let Some(handler) = self.step_changed.as_mut() {
            handler(step, previous);
        }
    }

    pub(crate) fn finished(&mut self, disposition: Disposition) {
        if let Some(handler) = self.finished.as_mut() {
            handler(disposition);
        }
    }
}
