//! Configuration module for Echo-Sieve
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use echo_sieve::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("echo-sieve.toml")).unwrap();
//! println!("Mirrors go to: {}", config.storage.download_dir.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExtractionConfig, LimitsConfig, RetentionConfig, StorageConfig, TimeoutConfig,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
