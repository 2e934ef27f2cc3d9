//! Provider adapter implementations.

pub mod mock_provider;

pub use mock_provider::{MockProvider, ProviderCall};
