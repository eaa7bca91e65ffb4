//! URL handling module for docs-to-markdown
//!
//! This module provides URL normalization, domain extraction, same-site
//! matching, and classification of discovered links.

mod domain;
mod matcher;
mod normalize;

use crate::config::CrawlerConfig;
use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, site_authority};
pub use matcher::host_matches;
pub use normalize::{normalize_url, NormalizeOptions};

/// Decides whether `candidate` belongs to the same site as `site`
///
/// Hosts are compared exactly unless `include_subdomains` is set. Explicit
/// ports must agree; a port that is the scheme default counts as absent, so
/// `http://ex.com` and `https://ex.com` are the same site.
pub fn same_domain(site: &Url, candidate: &Url, include_subdomains: bool) -> bool {
    let (Some(site_host), Some(candidate_host)) = (site.host_str(), candidate.host_str()) else {
        return false;
    };

    site.port() == candidate.port()
        && host_matches(site_host, candidate_host, include_subdomains)
}

/// What to do with a link found on a page
#[derive(Debug)]
pub enum LinkDecision {
    /// Link is crawlable; carries its normalized form
    Accept(Url),
    /// Link could not be parsed or uses an unsupported scheme
    Malformed(UrlError),
    /// Link points outside the site
    OffDomain(Url),
    /// Link would sit deeper than the configured maximum
    DepthExceeded(Url),
}

/// The rules links are classified against during one crawl
#[derive(Debug, Clone)]
pub struct LinkPolicy {
    site: Url,
    max_depth: u32,
    include_subdomains: bool,
    options: NormalizeOptions,
}

impl LinkPolicy {
    /// Creates a policy for the site the (normalized) seed belongs to
    pub fn new(site: Url, config: &CrawlerConfig) -> Self {
        Self {
            site,
            max_depth: config.max_depth,
            include_subdomains: config.include_subdomains,
            options: NormalizeOptions::from(config),
        }
    }

    pub fn site(&self) -> &Url {
        &self.site
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn normalize_options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Normalizes a URL with this policy's options
    pub fn normalize(&self, raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
        normalize_url(raw, base, &self.options)
    }

    pub fn is_same_domain(&self, url: &Url) -> bool {
        same_domain(&self.site, url, self.include_subdomains)
    }

    /// Classifies a raw href found on a page at `parent_depth`
    ///
    /// Checks run in this order: parse, domain, depth. Whether the URL was
    /// already visited is left to the caller, which owns the visited set.
    pub fn classify_link(&self, raw: &str, base: &Url, parent_depth: u32) -> LinkDecision {
        let url = match self.normalize(raw, Some(base)) {
            Ok(url) => url,
            Err(e) => return LinkDecision::Malformed(e),
        };

        if !self.is_same_domain(&url) {
            return LinkDecision::OffDomain(url);
        }

        if parent_depth.saturating_add(1) > self.max_depth {
            return LinkDecision::DepthExceeded(url);
        }

        LinkDecision::Accept(url)
    }
}
