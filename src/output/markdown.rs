//! Markdown generation
//!
//! This module converts filtered HTML to Markdown and formats the two
//! generated documents: the `SUMMARY.md` index of a tree crawl and the
//! combined `index.md` of a single-file crawl.

use crate::output::stats::CrawlStatistics;
use crate::output::traits::{MarkdownConverter, PageDocument, WrittenPage};

/// [`MarkdownConverter`] backed by the `html2md` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct Html2MdConverter;

impl MarkdownConverter for Html2MdConverter {
    fn convert(&self, html: &str) -> String {
        tidy_markdown(&html2md::parse_html(html))
    }
}

/// Strips trailing whitespace and collapses runs of blank lines
pub fn tidy_markdown(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;

    for line in markdown.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    let trimmed = out.trim_matches('\n');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

/// Formats the index written next to a page tree
///
/// Pages are listed in crawl order (depth, then admission order).
pub fn format_summary(pages: &[WrittenPage], stats: &CrawlStatistics) -> String {
    let mut sorted: Vec<&WrittenPage> = pages.iter().collect();
    sorted.sort_by_key(|p| (p.depth, p.sequence));

    let mut md = String::new();
    md.push_str("# Documentation Index\n\n");

    for page in sorted {
        md.push_str(&format!(
            "- [{}]({})\n",
            escape_link_text(&page.title),
            page.path
        ));
    }
    md.push('\n');

    md.push_str("## Crawl Information\n\n");
    md.push_str(&format!(
        "- **Started**: {}\n",
        stats.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(finished) = stats.finished_at {
        md.push_str(&format!(
            "- **Finished**: {}\n",
            finished.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    md.push_str(&format!("- **Pages written**: {}\n", stats.succeeded));
    md.push_str(&format!("- **Pages skipped**: {}\n", stats.skipped));
    md.push_str(&format!("- **Pages failed**: {}\n", stats.failed));

    md
}

/// Formats every page as one section of a single document
pub fn format_single_document(pages: &[PageDocument]) -> String {
    let mut sorted: Vec<&PageDocument> = pages.iter().collect();
    sorted.sort_by_key(|p| (p.depth, p.sequence));

    let mut md = String::new();
    for page in sorted {
        md.push_str(&format!(
            "# {}\n\n{}\n\n---\n\n",
            page.title,
            page.markdown.trim_end()
        ));
    }
    md
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}
