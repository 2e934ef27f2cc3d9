//! Error types for the state machine engine.

use thiserror::Error;

/// Errors reported by [`StateMachine`](super::StateMachine) operations.
///
/// None of these leave the engine without an active node.
///
/// Node ids are rendered with their `Debug` form, so a `&str` id shows up
/// quoted (`"\"idle\""`) while an enum id does not (`"Idle"`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsmError {
    /// A node with the same id is already registered.
    #[error("State already registered: {0}")]
    DuplicateNode(String),

    /// The requested node was never registered.
    #[error("State not registered: {0}")]
    UnknownState(String),

    /// A transition was requested before `run` selected an entry node.
    #[error("State machine is not running")]
    NotRunning,
}
