//! Scaffolding of a `.hotpatch/` directory.
//!
//! Generates the pipeline settings (`config.toml`) and package definitions
//! (`packages/*.yaml`) from templates embedded at compile time.
//!
//! # Example
//!
//! ```no_run
//! use hp_core::init::{generate_hotpatch_structure, InitOptions};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = InitOptions {
//!     target_dir: PathBuf::from("."),
//!     force: false,
//!     minimal: false,
//! };
//!
//! generate_hotpatch_structure(options).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod templates;

pub use error::{InitError, InitResult};
pub use generator::{generate_hotpatch_structure, InitOptions};
pub use templates::{get_template, list_templates};
