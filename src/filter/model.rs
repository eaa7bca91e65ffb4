//! Language-model assisted content extraction
//!
//! The page is cleaned of obvious chrome, split into blocks, packed into
//! chunks and each chunk is judged by a [`Classifier`]. A classifier failure
//! never loses content: the chunk is kept unfiltered.

use super::dom;
use super::ExtractedContent;
use crate::config::ModelConfig;
use async_trait::async_trait;
use ego_tree::{NodeId, NodeRef};
use reqwest::Client;
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Rough characters-per-token ratio used to size chunks
const CHARS_PER_TOKEN: usize = 4;

/// Why a classification attempt produced no verdict
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Classifier request timed out")]
    Timeout,

    #[error("Classifier HTTP error: {0}")]
    Http(String),

    #[error("Malformed classifier response: {0}")]
    Malformed(String),
}

/// Decides whether a block of HTML is documentation content
#[async_trait]
pub trait Classifier: Send + Sync {
    /// `Ok(true)` keeps the block, `Ok(false)` drops it
    async fn classify(&self, block: &str) -> Result<bool, ClassifyError>;
}

/// Content filter that defers the keep/drop decision to a [`Classifier`]
#[derive(Clone)]
pub struct ModelFilter {
    classifier: Arc<dyn Classifier>,
    chunk_token_threshold: usize,
}

impl std::fmt::Debug for ModelFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFilter")
            .field("chunk_token_threshold", &self.chunk_token_threshold)
            .finish_non_exhaustive()
    }
}

impl ModelFilter {
    pub fn new(classifier: Arc<dyn Classifier>, chunk_token_threshold: usize) -> Self {
        Self {
            classifier,
            chunk_token_threshold: chunk_token_threshold.max(1),
        }
    }

    pub async fn filter(&self, html: &str) -> ExtractedContent {
        let max_block_chars = self.chunk_token_threshold.saturating_mul(CHARS_PER_TOKEN);
        let chunks = pack_chunks(segment_blocks(html, max_block_chars), self.chunk_token_threshold);

        let mut kept = String::new();
        let mut blocks_kept = 0;
        let mut blocks_dropped = 0;
        let mut classification_failures = 0;

        for (index, chunk) in chunks.iter().enumerate() {
            match self.classifier.classify(chunk).await {
                Ok(true) => {
                    kept.push_str(chunk);
                    blocks_kept += 1;
                }
                Ok(false) => {
                    tracing::debug!("Classifier dropped chunk {} ({} chars)", index, chunk.len());
                    blocks_dropped += 1;
                }
                Err(e) => {
                    tracing::warn!("Classification of chunk {} failed, keeping it: {}", index, e);
                    kept.push_str(chunk);
                    blocks_kept += 1;
                    classification_failures += 1;
                }
            }
        }

        ExtractedContent {
            text_len: dom::visible_text_len(&kept),
            html: kept,
            blocks_kept,
            blocks_dropped,
            classification_failures,
        }
    }
}

/// Splits a page into top-level content blocks
///
/// Chrome is removed first, so the classifier only sees the content region.
/// Wrappers larger than `max_block_chars` are opened up into their children.
pub(crate) fn segment_blocks(html: &str, max_block_chars: usize) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut removed = HashSet::new();
    dom::mark_boilerplate(doc.tree.root(), &mut removed);
    let region = dom::select_region(&doc, &removed);

    let mut blocks = Vec::new();
    collect_blocks(*region, &removed, max_block_chars, &mut blocks);
    blocks
}

fn collect_blocks(
    node: NodeRef<'_, Node>,
    removed: &HashSet<NodeId>,
    max_block_chars: usize,
    blocks: &mut Vec<String>,
) {
    for child in node.children() {
        if removed.contains(&child.id()) {
            continue;
        }
        match child.value() {
            Node::Text(text) if !text.trim().is_empty() => {
                blocks.push(dom::serialize(child, removed));
            }
            Node::Element(el) => {
                let html = dom::serialize(child, removed);
                let wrapper = matches!(el.name(), "div" | "section" | "main" | "article");
                if wrapper && html.len() > max_block_chars {
                    collect_blocks(child, removed, max_block_chars, blocks);
                } else if dom::metrics(child, removed).text_len > 0 || dom::has_media(child, removed) {
                    blocks.push(html);
                }
            }
            _ => {}
        }
    }
}

fn approx_tokens(text: &str) -> usize {
    (text.chars().count() + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}

/// Packs blocks in order into chunks of at most `threshold` approximate tokens
///
/// A single block over the threshold becomes a chunk of its own.
pub(crate) fn pack_chunks(blocks: Vec<String>, threshold: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0;

    for block in blocks {
        let tokens = approx_tokens(&block);
        if !current.is_empty() && current_tokens + tokens > threshold {
            chunks.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current.push_str(&block);
        current_tokens += tokens;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// [`Classifier`] backed by an OpenAI-compatible chat-completions API
///
/// The model is asked to answer `KEEP` or `DROP`; any other answer is
/// reported as [`ClassifyError::Malformed`].
#[derive(Clone)]
pub struct OpenAiClassifier {
    http_client: Client,
    base_url: String,
    model: String,
    instruction: String,
    api_key: String,
}

impl OpenAiClassifier {
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            instruction: config.instruction.clone(),
            api_key: api_key.into(),
        })
    }
}

/// Reads a KEEP/DROP verdict out of a model answer
fn parse_verdict(answer: &str) -> Result<bool, ClassifyError> {
    let word = answer
        .trim()
        .trim_matches(|c: char| !c.is_ascii_alphabetic())
        .to_ascii_uppercase();
    match word.as_str() {
        "KEEP" => Ok(true),
        "DROP" => Ok(false),
        _ => Err(ClassifyError::Malformed(format!(
            "expected KEEP or DROP, got {:?}",
            answer
        ))),
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, block: &str) -> Result<bool, ClassifyError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.instruction,
                },
                ChatMessage {
                    role: "user",
                    content: block,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifyError::Timeout
                } else {
                    ClassifyError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Http(format!("status {}", status.as_u16())));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::Malformed(e.to_string()))?;

        let answer = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifyError::Malformed("response has no choices".to_string()))?;

        parse_verdict(&answer)
    }
}
