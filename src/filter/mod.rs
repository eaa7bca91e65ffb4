//! Content filter module for docs-to-markdown
//!
//! A filter takes a full HTML page and returns only the part worth keeping as
//! documentation. Two variants exist and one is chosen per crawl:
//!
//! - `Heuristic`: deterministic rules (boilerplate removal, region selection,
//!   link-density pruning)
//! - `ModelBased`: the page is chunked and a [`Classifier`] decides per chunk;
//!   classifier failures keep the chunk

mod dom;
mod heuristic;
mod model;

pub use heuristic::HeuristicFilter;
pub use model::{Classifier, ClassifyError, ModelFilter, OpenAiClassifier};

use crate::config::{FilterConfig, FilterVariant};
use crate::{ConfigError, DocsError};
use std::sync::Arc;

/// The reduced HTML of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    /// Surviving HTML fragment, in document order
    pub html: String,

    /// Visible characters in `html`, whitespace excluded
    pub text_len: usize,

    pub blocks_kept: usize,
    pub blocks_dropped: usize,

    /// Chunks kept only because the classifier failed on them
    pub classification_failures: usize,
}

impl ExtractedContent {
    /// True when no visible text remains
    pub fn is_empty(&self) -> bool {
        self.text_len == 0
    }
}

/// The content filter used for a whole crawl
#[derive(Debug, Clone)]
pub enum ContentFilter {
    Heuristic(HeuristicFilter),
    ModelBased(ModelFilter),
}

impl ContentFilter {
    /// Builds the filter selected by configuration
    ///
    /// The model variant talks to an OpenAI-compatible endpoint and needs an
    /// API key.
    pub fn from_config(config: &FilterConfig) -> Result<Self, DocsError> {
        match config.variant {
            FilterVariant::Heuristic => Ok(Self::Heuristic(HeuristicFilter::from_config(config))),
            FilterVariant::Model => {
                let api_key = config.model.api_key.clone().ok_or_else(|| {
                    ConfigError::Validation(
                        "model filtering needs an API key (--openai-key or OPENAI_API_KEY)"
                            .to_string(),
                    )
                })?;
                let classifier = OpenAiClassifier::new(&config.model, api_key)?;
                Ok(Self::ModelBased(ModelFilter::new(
                    Arc::new(classifier),
                    config.model.chunk_token_threshold,
                )))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Heuristic(_) => "heuristic",
            Self::ModelBased(_) => "model",
        }
    }

    /// Reduces a page to its substantive content
    pub async fn filter(&self, html: &str) -> ExtractedContent {
        match self {
            Self::Heuristic(filter) => filter.extract(html),
            Self::ModelBased(filter) => filter.filter(html).await,
        }
    }
}
