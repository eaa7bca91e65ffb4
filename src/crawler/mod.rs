//! Crawler module for fetching and processing documentation pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `PageFetcher` trait
//! - HTML parsing for titles and links
//! - The resource-adaptive dispatcher that bounds concurrency
//! - The breadth-first crawl engine

mod dispatcher;
mod engine;
mod fetcher;
mod gauge;
mod parser;

pub use dispatcher::{Dispatcher, DispatcherConfig, Permit, ResourceBudget};
pub use engine::{
    CrawlEngine, CrawlReport, CrawlTask, FetchFailure, Frontier, PageError, PageOutcome,
    VisitedSet,
};
pub use fetcher::{build_http_client, user_agent_string, FetchResult, HttpFetcher, PageFetcher};
pub use gauge::{FixedGauge, PressureGauge, SystemMemoryGauge};
pub use parser::{parse_html, ParsedPage};

use crate::config::Config;
use crate::filter::ContentFilter;
use crate::output::{prepare_output_root, Html2MdConverter, PageSink};
use crate::DocsError;
use std::sync::Arc;
use url::Url;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher and the content filter
/// 2. Prepare the output root
/// 3. Crawl the site breadth-first from `seed`
/// 4. Write the summary or combined document
///
/// Ctrl-C stops admitting new pages; running ones are finished first.
pub async fn crawl(config: &Config, seed: &Url) -> Result<CrawlReport, DocsError> {
    let fetcher = HttpFetcher::from_config(&config.user_agent, &config.crawler)?;
    let filter = ContentFilter::from_config(&config.filter)?;

    let root = prepare_output_root(&config.output)?;
    tracing::info!("Writing pages under {}", root.display());
    let sink = PageSink::new(config.output.mode, root);

    let engine = CrawlEngine::new(
        &config.crawler,
        seed,
        Arc::new(fetcher),
        filter,
        Arc::new(Html2MdConverter),
        Arc::new(sink),
        Arc::new(SystemMemoryGauge::new()),
    )?;
    engine.run().await
}
