//! Output module for writing the Markdown mirror
//!
//! This module handles:
//! - Mapping page URLs to files under the output root
//! - Converting filtered HTML to Markdown
//! - Writing pages in tree or single-file layout
//! - Recording crawl statistics

mod markdown;
mod path_mapper;
mod sink;
pub mod stats;
mod traits;

pub use markdown::{format_single_document, format_summary, tidy_markdown, Html2MdConverter};
pub use path_mapper::{FileTarget, PathError, PathMapper};
pub use sink::{prepare_output_root, PageSink, SINGLE_FILE, SUMMARY_FILE};
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{
    title_from_url, MarkdownConverter, OutputError, OutputResult, PageDocument, WrittenPage,
};
