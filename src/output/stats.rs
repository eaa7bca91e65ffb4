//! Crawl statistics
//!
//! The engine owns one [`CrawlStatistics`] for the whole run and updates it
//! as task reports arrive; it is printed at the end and written into the
//! summary.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Tasks accepted into the frontier, seed included
    pub discovered: u64,

    /// Tasks that reached a terminal state
    pub processed: u64,

    pub succeeded: u64,
    pub skipped: u64,
    pub failed: u64,

    /// Links found on fetched pages, before any filtering
    pub links_seen: u64,

    /// Chunks kept only because the classifier failed
    pub classification_failures: u64,

    /// Written pages per depth
    pub pages_by_depth: BTreeMap<u32, u64>,

    /// Task errors and link rejections by kind
    pub error_summary: BTreeMap<&'static str, u64>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self {
            discovered: 0,
            processed: 0,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            links_seen: 0,
            classification_failures: 0,
            pages_by_depth: BTreeMap::new(),
            error_summary: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_success(&mut self, depth: u32) {
        self.processed += 1;
        self.succeeded += 1;
        *self.pages_by_depth.entry(depth).or_insert(0) += 1;
    }

    pub fn record_skipped(&mut self, kind: &'static str) {
        self.processed += 1;
        self.skipped += 1;
        self.record_error(kind);
    }

    pub fn record_failed(&mut self, kind: &'static str) {
        self.processed += 1;
        self.failed += 1;
        self.record_error(kind);
    }

    /// Counts an error that did not end a task (such as a rejected link)
    pub fn record_error(&mut self, kind: &'static str) {
        *self.error_summary.entry(kind).or_insert(0) += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Percentage of processed tasks that produced a page
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.processed as f64) * 100.0
        }
    }
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  URLs discovered: {}", stats.discovered);
    println!("  URLs processed: {}", stats.processed);
    println!("  Successful: {}", stats.succeeded);
    println!("  Skipped: {}", stats.skipped);
    println!("  Failed: {}", stats.failed);
    println!("  Links found: {}", stats.links_seen);
    println!("  Elapsed time: {:.2}s", stats.duration_seconds());
    println!();

    if !stats.pages_by_depth.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &stats.pages_by_depth {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if !stats.error_summary.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.error_summary.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

        for (kind, count) in error_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if stats.classification_failures > 0 {
        println!(
            "Classifier failures (content kept unfiltered): {}",
            stats.classification_failures
        );
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages written)",
        stats.success_rate(),
        stats.succeeded,
        stats.processed
    );
}
