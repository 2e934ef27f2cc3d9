//! # hp-core
//!
//! State machine engine and resource hot-update pipeline for hotpatch-kit.
//!
//! ## Modules
//!
//! - [`fsm`]: Generic node-based state machine with a shared blackboard
//! - [`provider`]: Resource package provider abstraction and a scripted mock
//! - [`patch`]: The patch pipeline orchestrator and its eight steps
//! - [`config`]: Configuration loading from the `.hotpatch/` directory
//! - [`init`]: Scaffolding of a `.hotpatch/` directory

pub mod config;
pub mod fsm;
pub mod init;
pub mod patch;
pub mod provider;
