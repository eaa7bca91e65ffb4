//! Rule-based content extraction
//!
//! The heuristic filter never talks to anything outside the process: the
//! same HTML and the same settings always produce byte-identical output.

use super::dom::{self, Metrics};
use super::ExtractedContent;
use crate::config::FilterConfig;
use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node};
use std::collections::HashSet;

/// Bonus for blocks whose class/id looks like content
const POSITIVE_CLASS_WEIGHT: f64 = 0.2;

/// Deterministic boilerplate remover
///
/// 1. Page chrome (navigation, headers, footers, scripts, hidden elements and
///    anything whose class/id looks like chrome) is removed.
/// 2. The richest `main`/`article`/content-like element becomes the region.
/// 3. Inside the region, link clusters and empty containers are dropped and
///    every leaf block is scored `tag_weight * (1 - link_density) +
///    class_weight`; blocks below `threshold` are dropped.
/// 4. What survives is serialized in document order.
#[derive(Debug, Clone)]
pub struct HeuristicFilter {
    threshold: f64,
    min_words: usize,
    max_link_density: f64,
}

#[derive(Debug, Default)]
struct BlockCounts {
    kept: usize,
    dropped: usize,
}

impl HeuristicFilter {
    pub fn new(threshold: f64, min_words: usize, max_link_density: f64) -> Self {
        Self {
            threshold,
            min_words,
            max_link_density,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.threshold, config.min_words, config.max_link_density)
    }

    /// Extracts the substantive content of a full HTML document
    pub fn extract(&self, html: &str) -> ExtractedContent {
        let doc = Html::parse_document(html);
        let mut removed = HashSet::new();
        dom::mark_boilerplate(doc.tree.root(), &mut removed);

        let region = dom::select_region(&doc, &removed);
        tracing::trace!("Heuristic region: <{}>", region.value().name());

        let mut counts = BlockCounts::default();
        self.prune(*region, &mut removed, &mut counts);

        let text_len = dom::metrics(*region, &removed).text_len;
        ExtractedContent {
            html: dom::serialize_children(*region, &removed),
            text_len,
            blocks_kept: counts.kept,
            blocks_dropped: counts.dropped,
            classification_failures: 0,
        }
    }

    fn is_link_cluster(&self, m: &Metrics) -> bool {
        m.link_density() > self.max_link_density && m.non_link_words() < self.min_words
    }

    fn prune(&self, node: NodeRef<'_, Node>, removed: &mut HashSet<NodeId>, counts: &mut BlockCounts) {
        for child in node.children() {
            if removed.contains(&child.id()) {
                continue;
            }
            let Node::Element(el) = child.value() else {
                continue;
            };
            let name = el.name();

            if dom::is_container(name) {
                let m = dom::metrics(child, removed);
                if m.text_len == 0 && !dom::has_media(child, removed) {
                    removed.insert(child.id());
                    counts.dropped += 1;
                } else if self.is_link_cluster(&m) {
                    tracing::trace!("Dropping link cluster <{}> ({} words)", name, m.words);
                    removed.insert(child.id());
                    counts.dropped += 1;
                } else {
                    self.prune(child, removed, counts);
                }
            } else if let Some(weight) = dom::block_weight(name) {
                let m = dom::metrics(child, removed);
                if m.text_len == 0 && !dom::has_media(child, removed) {
                    removed.insert(child.id());
                    counts.dropped += 1;
                    continue;
                }

                let class_weight = if dom::has_positive_pattern(el) {
                    POSITIVE_CLASS_WEIGHT
                } else {
                    0.0
                };
                let score = weight * (1.0 - m.link_density()) + class_weight;
                if score < self.threshold {
                    removed.insert(child.id());
                    counts.dropped += 1;
                } else {
                    counts.kept += 1;
                }
            }
        }
    }
}

impl Default for HeuristicFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}
