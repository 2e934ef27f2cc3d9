//! Generic node-based finite state machine.
//!
//! This module provides:
//! - [`Blackboard`]: a typed key/value scratch space shared by all nodes
//! - [`StateNode`]: the lifecycle contract every node implements
//! - [`StateMachine`]: the engine that owns nodes, validates transitions and
//!   applies asynchronous completions on the caller's call chain

pub mod blackboard;
pub mod error;
pub mod machine;
pub mod node;

pub use blackboard::Blackboard;
pub use error::FsmError;
pub use machine::{Completion, MachineContext, Notifier, StateMachine, StateObserver};
pub use node::{NodeId, StateNode};
