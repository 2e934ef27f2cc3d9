//! Assertion helpers over recorded `PatchEvent` streams.

use hp_protocol::ipc::PatchEvent;
use hp_protocol::patch_models::{Disposition, PatchStep};

/// Steps in the order they were entered.
pub fn step_sequence(events: &[PatchEvent]) -> Vec<PatchStep> {
    events
        .iter()
        .filter_map(|e| match e {
            PatchEvent::StepChanged { step, .. } => Some(*step),
            _ => None,
        })
        .collect()
}

/// `(count, bytes)` of every FoundUpdateFiles event.
#[allow(dead_code)]
pub fn found_update_files(events: &[PatchEvent]) -> Vec<(u32, u64)> {
    events
        .iter()
        .filter_map(|e| match e {
            PatchEvent::FoundUpdateFiles {
                total_count,
                total_bytes,
                ..
            } => Some((*total_count, *total_bytes)),
            _ => None,
        })
        .collect()
}

#[allow(dead_code)]
pub fn count_download_errors(events: &[PatchEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PatchEvent::DownloadError { .. }))
        .count()
}

/// Number of gate failure events of any kind.
#[allow(dead_code)]
pub fn count_gate_failures(events: &[PatchEvent]) -> usize {
    events
        .iter()
        .filter(|e| {
            matches!(
                e,
                PatchEvent::InitializeFailed { .. }
                    | PatchEvent::VersionRequestFailed { .. }
                    | PatchEvent::ManifestUpdateFailed { .. }
            )
        })
        .count()
}

#[allow(dead_code)]
pub fn has_download_activity(events: &[PatchEvent]) -> bool {
    events.iter().any(|e| {
        matches!(
            e,
            PatchEvent::DownloadProgress { .. }
                | PatchEvent::DownloadError { .. }
                | PatchEvent::DownloadFailed { .. }
        )
    })
}

/// The disposition of the single Finished event, which must be the last one.
pub fn assert_finished_last(events: &[PatchEvent], expected: Disposition) {
    let finished: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            PatchEvent::Finished { disposition, .. } => Some(*disposition),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![expected], "exactly one Finished event");
    assert!(
        matches!(events.last(), Some(PatchEvent::Finished { .. })),
        "Finished should be the last event, got: {:?}",
        events.last()
    );
}
