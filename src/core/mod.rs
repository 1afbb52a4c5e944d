//! Core domain types, configuration and errors for firegen.

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder};
pub use error::{FiregenError, Result};
pub use types::{AttributeCombination, AttributeDefinition, AttributePair, ServiceName};
