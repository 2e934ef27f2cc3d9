//! Resource hot-update pipeline.
//!
//! [`PatchOperation`] drives one package through eight steps:
//!
//! ```text
//! InitializePackage -> RequestPackageVersion -> UpdatePackageManifest
//!     -> CreateDownloader -> DownloadPackageFiles -> DownloadPackageOver
//!     -> ClearCacheBundle -> StartGame
//! ```
//!
//! CreateDownloader skips straight to StartGame when nothing needs
//! downloading. The three gate steps (initialize, version request, manifest
//! update) wait for a host retry after a failure, and give up once their
//! retry counter passes the configured cap.

pub mod callbacks;
pub mod context;
pub mod error;
pub mod keys;
pub mod operation;
pub mod steps;

pub use callbacks::PatchCallbacks;
pub use context::{PatchContext, PatchMachine, StepContext};
pub use error::PatchError;
pub use operation::PatchOperation;
