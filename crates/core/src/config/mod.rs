//! Configuration loading and management.
//!
//! This module loads the patch settings and package definitions from the
//! `.hotpatch/` directory structure.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::AppConfig;
