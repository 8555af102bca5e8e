//! Configuration module for Module-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolving remote-provider credentials from the environment.
//!
//! # Example
//!
//! ```no_run
//! use module_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, Credentials, ExtractionConfig, InferenceConfig, RemoteConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
