//! Blackboard keys shared by the pipeline steps.

/// Package name (`String`), written when the run starts.
pub const PACKAGE_NAME: &str = "PackageName";

/// Play mode (`PlayMode`), written when the run starts.
pub const PLAY_MODE: &str = "PlayMode";

/// Version token (`String`), written by RequestPackageVersion and read by
/// UpdatePackageManifest.
pub const PACKAGE_VERSION: &str = "PackageVersion";

/// Downloader handle (`Arc<dyn PackageDownloader>`), written by
/// CreateDownloader and read by DownloadPackageFiles.
pub const DOWNLOADER: &str = "Downloader";
