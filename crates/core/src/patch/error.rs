//! Error types for patch pipeline operations.

use crate::fsm::FsmError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// `start` was called on a run that already started.
    #[error("Patch pipeline already started")]
    AlreadyStarted,

    /// The underlying state machine rejected an operation.
    #[error(transparent)]
    StateMachine(#[from] FsmError),
}
