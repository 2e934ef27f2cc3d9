//! Host side of a patch run: ticks the operation and answers its callbacks.

use crate::cli::RunArgs;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use colored::Colorize;
use hp_core::patch::PatchOperation;
use hp_core::provider::adapters::MockProvider;
use hp_protocol::config_models::PatchSettings;
use hp_protocol::ipc::PatchEvent;
use hp_protocol::package_models::{PackageConfig, RemoteSnapshot};
use hp_protocol::patch_models::{Gate, PatchReport};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// What the host does next after reading an event.
enum Reply {
    Retry(Gate),
    BeginDownload,
    RetryDownload,
    Abort,
}

pub async fn run(
    package: PackageConfig,
    settings: PatchSettings,
    args: &RunArgs,
) -> Result<PatchReport> {
    let remote = package.remote.clone().unwrap_or_else(|| RemoteSnapshot {
        version: "local".to_string(),
        files: Vec::new(),
    });
    let provider = MockProvider::with_delay(remote, Duration::from_millis(args.delay_ms))
        .fail_gate(Gate::Initialize, args.fail_init)
        .fail_gate(Gate::RequestVersion, args.fail_version)
        .fail_gate(Gate::UpdateManifest, args.fail_manifest);

    let mut op = PatchOperation::with_settings(
        package.name.clone(),
        package.play_mode,
        Arc::new(provider),
        settings,
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    op.forward_events(tx);
    op.start().wrap_err("failed to start patch run")?;

    let mut download_retries_left = args.download_retries;
    let mut interval = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));

    while !op.is_done() {
        interval.tick().await;
        op.tick();

        while let Ok(event) = rx.try_recv() {
            if args.json {
                println!("{}", serde_json::to_string(&event)?);
            } else {
                print_event(&event);
            }

            let reply = match event {
                PatchEvent::InitializeFailed { .. } => Some(Reply::Retry(Gate::Initialize)),
                PatchEvent::VersionRequestFailed { .. } => {
                    Some(Reply::Retry(Gate::RequestVersion))
                }
                PatchEvent::ManifestUpdateFailed { .. } => {
                    Some(Reply::Retry(Gate::UpdateManifest))
                }
                PatchEvent::FoundUpdateFiles {
                    total_count,
                    total_bytes,
                    ..
                } => {
                    let question = format!(
                        "download {total_count} files ({}), continue?",
                        format_bytes(total_bytes)
                    );
                    if confirm(question, args.yes).await? {
                        Some(Reply::BeginDownload)
                    } else {
                        Some(Reply::Abort)
                    }
                }
                PatchEvent::DownloadFailed { .. } => {
                    if download_retries_left == 0 {
                        Some(Reply::Abort)
                    } else if confirm("retry download?".to_string(), args.yes).await? {
                        download_retries_left -= 1;
                        Some(Reply::RetryDownload)
                    } else {
                        Some(Reply::Abort)
                    }
                }
                _ => None,
            };

            match reply {
                // The operation enforces the retry cap itself.
                Some(Reply::Retry(gate)) => match gate {
                    Gate::Initialize => op.user_retry_initialize(),
                    Gate::RequestVersion => op.user_retry_request_version(),
                    Gate::UpdateManifest => op.user_retry_update_manifest(),
                },
                Some(Reply::BeginDownload) => op.user_begin_download(),
                Some(Reply::RetryDownload) => op.user_retry_download(),
                Some(Reply::Abort) => op.abort(),
                None => {}
            }
        }
    }

    // Events fired by the final step are still queued.
    while let Ok(event) = rx.try_recv() {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_event(&event);
        }
    }

    debug!(run_id = %op.run_id(), "host loop finished");
    Ok(op.report())
}

fn print_event(event: &PatchEvent) {
    match event {
        PatchEvent::StepChanged { step, .. } => {
            println!("{} {}", "==>".blue().bold(), step.name());
        }
        PatchEvent::InitializeFailed { .. } => {
            println!("{} package initialization failed", "!".yellow().bold());
        }
        PatchEvent::VersionRequestFailed { .. } => {
            println!("{} version request failed", "!".yellow().bold());
        }
        PatchEvent::ManifestUpdateFailed { .. } => {
            println!("{} manifest update failed", "!".yellow().bold());
        }
        PatchEvent::FoundUpdateFiles {
            total_count,
            total_bytes,
            ..
        } => {
            println!(
                "    found {total_count} files to update ({})",
                format_bytes(*total_bytes)
            );
        }
        PatchEvent::DownloadProgress { progress, .. } => {
            println!(
                "    {}/{} files, {} / {}",
                progress.current_count,
                progress.total_count,
                format_bytes(progress.current_bytes),
                format_bytes(progress.total_bytes)
            );
        }
        PatchEvent::DownloadError {
            file_name, error, ..
        } => {
            println!("    {} {file_name}: {error}", "error".red());
        }
        PatchEvent::DownloadFailed { reason, .. } => {
            println!("{} download failed: {reason}", "x".red().bold());
        }
        PatchEvent::Finished { disposition, .. } => {
            if disposition.is_success() {
                println!("{} patch complete", "ok".green().bold());
            } else {
                println!("{} patch ended: {disposition:?}", "x".red().bold());
            }
        }
    }
}

/// Ask a yes/no question on stdin. `assume_yes` answers it without asking.
async fn confirm(question: String, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    tokio::task::spawn_blocking(move || -> Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{} {question} [y/N] ", "?".cyan().bold())?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    })
    .await
    .map_err(|err| eyre!("prompt task failed: {err}"))?
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}
