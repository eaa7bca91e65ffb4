//! docs-to-markdown: mirror a documentation site as Markdown
//!
//! This crate crawls a documentation website breadth-first from a seed URL,
//! keeps only the substantive content of every page, converts it to Markdown
//! and writes it to disk in a layout that mirrors the site's URL paths.

pub mod config;
pub mod crawler;
pub mod filter;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for docs-to-markdown operations
///
/// These are run-level errors. Problems with a single page are reported as
/// [`crawler::PageError`] and never abort the crawl.
#[derive(Debug, Error)]
pub enum DocsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid output root {path}: {reason}")]
    OutputRoot { path: String, reason: String },

    #[error("Seed URL {url} is unreachable: {reason}")]
    SeedUnreachable { url: String, reason: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TaskState,
        to: state::TaskState,
    },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Dispatcher closed, no further tasks can be admitted")]
    DispatcherClosed,

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
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for docs-to-markdown operations
pub type Result<T> = std::result::Result<T, DocsError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEngine, CrawlReport};
pub use filter::ContentFilter;
pub use state::TaskState;
pub use crate::url::{normalize_url, same_domain, NormalizeOptions};
