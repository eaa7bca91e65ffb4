//! Configuration module for docs-to-markdown
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file and merging the command-line overrides into it.
//!
//! # Example
//!
//! ```no_run
//! use docs_to_markdown::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("docs.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FilterConfig, FilterVariant, ModelConfig, OutputConfig, OutputMode,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
    Overrides,
};
pub use validation::{validate, validate_seed};
