//! Module-Scout: documentation site outliner
//!
//! This crate crawls a documentation website within depth/page/time limits,
//! strips page chrome down to ordered content blocks, and infers a
//! `module → description → {submodule → description}` outline using a chain
//! of extraction strategies (remote language models first, then a
//! deterministic local heuristic).

pub mod config;
pub mod content;
pub mod crawler;
pub mod inference;
pub mod pipeline;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Module-Scout operations
///
/// Only run-level conditions surface here. Per-page fetch failures and
/// per-strategy inference failures are absorbed and reported as data.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No valid seed URLs ({rejected} rejected)")]
    NoValidSeeds { rejected: usize },

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Empty URL")]
    Empty,

    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Module-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use content::{BlockKind, ContentBlock, ContentExtractor, PageContent};
pub use crawler::{CrawlLimits, CrawlLogEntry, CrawlReport, Crawler, FetchResult};
pub use inference::{ExtractionResult, InferenceEngine, Module, StrategyKind, Submodule};
pub use pipeline::{Pipeline, RunOptions, RunReport, SeedReport};
pub use state::PageState;
pub use url::{normalize, normalize_all, InvalidUrl, Seed};
