//! Shared helpers for the patch pipeline integration tests.
//!
//! - Fixtures: remote snapshots and operations wired to a `MockProvider`
//! - Assertions over the `PatchEvent` stream a run emits

pub mod assertions;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
