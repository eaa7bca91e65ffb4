use crate::config::CrawlerConfig;
use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "_ga",
    "_gl",
];

/// Switches that change what counts as the same URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Remove tracking parameters (utm_* and friends)
    pub strip_tracking: bool,

    /// Keep the query string as part of the URL's identity
    pub query_identity: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            strip_tracking: true,
            query_identity: true,
        }
    }
}

impl From<&CrawlerConfig> for NormalizeOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            strip_tracking: config.strip_tracking_params,
            query_identity: config.query_identity,
        }
    }
}

/// Normalizes a URL into its canonical identity
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base` (when given); reject if malformed
/// 2. Accept only HTTP and HTTPS
/// 3. Lowercase scheme and host, drop default ports (done by the parser)
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Keep a trailing slash as exactly one slash; it is significant
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters (if enabled)
/// 7. Sort remaining query parameters alphabetically, or drop the query
///    entirely when it is not part of the identity
/// 8. Remove empty query string (trailing ?)
///
/// The result is a fixed point: normalizing it again returns it unchanged.
///
/// # Examples
///
/// ```
/// use docs_to_markdown::url::{normalize_url, NormalizeOptions};
///
/// let url = normalize_url("HTTPS://Example.COM:443//docs/./guide#intro", None, &NormalizeOptions::default()).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/guide");
/// ```
pub fn normalize_url(
    raw: &str,
    base: Option<&Url>,
    options: &NormalizeOptions,
) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Malformed("empty URL".to_string()));
    }

    // Step 1: Parse the URL
    let parsed = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };
    let mut url = parsed.map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Step 3: the url crate already lowercases the host of special schemes
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    // Credentials never identify a page
    if !url.username().is_empty() || url.password().is_some() {
        url.set_username("")
            .and_then(|_| url.set_password(None))
            .map_err(|_| UrlError::Malformed(format!("cannot strip credentials from {}", raw)))?;
    }

    // Step 4: Normalize path
    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    // Step 5: Remove fragment
    url.set_fragment(None);

    // Steps 6-8: Filter, sort or drop query parameters
    if url.query().is_some() {
        let params = if options.query_identity {
            filter_and_sort_query_params(&url, options.strip_tracking)
        } else {
            Vec::new()
        };

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments and repeated slashes
fn normalize_path(path: &str) -> String {
    let trailing_slash = path.ends_with('/');
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." | "%2e" | "%2E" => continue,
            // Parent directory - pop the last segment if possible
            ".." | "%2e%2e" | "%2E%2E" | ".%2e" | "%2e." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", normalized_segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url, strip_tracking: bool) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !(strip_tracking && is_tracking_param(key)))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    // Sort by key, then value, so repeated keys are stable too
    params.sort();

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
