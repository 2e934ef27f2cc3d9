//! # hp-protocol
//!
//! Core protocol definitions and data models for hotpatch-kit.
//!
//! This crate defines all shared data structures used for:
//! - Configuration file parsing (TOML settings, YAML package definitions)
//! - Patch pipeline run state and final dispositions
//! - Events pushed from the orchestrator and the resource provider to hosts
//!
//! ## Modules
//!
//! - [`config_models`]: Global settings from config.toml
//! - [`package_models`]: Package definitions and play modes
//! - [`patch_models`]: Pipeline steps, gates, status and run reports
//! - [`ipc`]: Download and pipeline events for host communication
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, chrono and uuid
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other hotpatch-kit crates

pub mod config_models;
pub mod ipc;
pub mod package_models;
pub mod patch_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use ipc::*;
pub use package_models::*;
pub use patch_models::*;
