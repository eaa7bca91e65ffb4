//! Output traits and types
//!
//! This module defines the collaborator interface for Markdown conversion
//! and the records the sinks keep about written pages.

use thiserror::Error;
use url::Url;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Refusing to overwrite existing file {0}")]
    AlreadyExists(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Turns filtered HTML into Markdown
pub trait MarkdownConverter: Send + Sync {
    fn convert(&self, html: &str) -> String;
}

/// A page ready to be written
#[derive(Debug, Clone)]
pub struct PageDocument {
    pub url: Url,
    pub title: String,
    pub markdown: String,
    pub depth: u32,

    /// Position of the page's task in admission order
    pub sequence: usize,
}

/// Information about a written page, as listed in the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPage {
    pub url: Url,
    pub title: String,

    /// Path relative to the output root, `/`-separated
    pub path: String,
    pub depth: u32,
    pub sequence: usize,
}

/// Builds a readable title from a URL path when the page has none
///
/// `/docs/getting-started.html` becomes `Docs > Getting Started`.
pub fn title_from_url(url: &Url) -> String {
    let path = url.path().trim_matches('/');
    if path.is_empty() {
        return "Index".to_string();
    }

    path.split('/')
        .map(|segment| {
            let segment = segment
                .strip_suffix(".html")
                .or_else(|| segment.strip_suffix(".htm"))
                .unwrap_or(segment);
            segment
                .split(|c| c == '-' || c == '_')
                .filter(|w| !w.is_empty())
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<String>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join(" > ")
}
