//! Configuration module for telechan
//!
//! Handles loading, parsing, and validating TOML configuration files.
//! Every section has production defaults, so running without a config
//! file is supported.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, RetryConfig, ServerConfig, UpstreamConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
