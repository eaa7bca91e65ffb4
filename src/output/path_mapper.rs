//! Maps page URLs to files under the output root
//!
//! The mapping is a pure function of the URL and the seed: it never looks at
//! the filesystem and never depends on crawl order.
//!
//! A URL whose path can be written as-is gets the plain name
//! (`/docs/intro` -> `docs/intro.md`). Every other URL gets its stem suffixed
//! with `~` and 16 hex digits of the SHA-256 of the full URL. Plain names
//! never contain `~`, so two distinct URLs can never share a file.

use crate::url::site_authority;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Longest file or directory name written, before any hash suffix
const MAX_SEGMENT_LEN: usize = 100;

/// Hex digits of the URL hash used to disambiguate names
const HASH_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Path traversal segment in {0}")]
    Traversal(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Where one page is written, relative to the output root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub url: Url,
    pub relative_dirs: Vec<String>,
    pub file_name: String,
}

impl FileTarget {
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.relative_dirs.iter().collect();
        path.push(&self.file_name);
        path
    }

    /// Relative path with `/` separators, as used in Markdown links
    pub fn link_path(&self) -> String {
        let mut parts: Vec<&str> = self.relative_dirs.iter().map(String::as_str).collect();
        parts.push(&self.file_name);
        parts.join("/")
    }

    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(self.relative_path())
    }
}

/// Replaces characters outside `[A-Za-z0-9._-]` and caps the length
///
/// Returns the cleaned segment and whether anything changed.
fn sanitize(segment: &str) -> (String, bool) {
    let mut altered = false;
    let mut clean: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                altered = true;
                '_'
            }
        })
        .collect();

    if clean.len() > MAX_SEGMENT_LEN {
        clean.truncate(MAX_SEGMENT_LEN);
        altered = true;
    }
    (clean, altered)
}

fn has_traversal(segments: &[&str]) -> bool {
    segments.iter().any(|s| *s == "." || *s == "..")
}

fn url_hash(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_LEN);
    hex
}

/// Deterministic URL to file mapping for one crawl
#[derive(Debug, Clone)]
pub struct PathMapper {
    seed: Url,
}

impl PathMapper {
    pub fn new(seed: &Url) -> Self {
        Self { seed: seed.clone() }
    }

    fn same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.seed.scheme()
            && url.host_str() == self.seed.host_str()
            && url.port() == self.seed.port()
    }

    // `Url::port` is `None` for scheme defaults, so http and https agree
    fn same_host(&self, url: &Url) -> bool {
        url.host_str() == self.seed.host_str() && url.port() == self.seed.port()
    }

    /// Maps a normalized URL to its file target
    ///
    /// # Examples
    ///
    /// ```
    /// use docs_to_markdown::output::PathMapper;
    /// use url::Url;
    ///
    /// let mapper = PathMapper::new(&Url::parse("https://ex.com/docs").unwrap());
    /// let page = Url::parse("https://ex.com/docs/intro").unwrap();
    /// assert_eq!(mapper.map_to_path(&page).unwrap().link_path(), "docs/intro.md");
    ///
    /// let dir = Url::parse("https://ex.com/docs/").unwrap();
    /// assert_eq!(mapper.map_to_path(&dir).unwrap().link_path(), "docs/index.md");
    /// ```
    pub fn map_to_path(&self, url: &Url) -> Result<FileTarget, PathError> {
        let authority =
            site_authority(url).ok_or_else(|| PathError::MissingHost(url.to_string()))?;

        let raw: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
        if has_traversal(&raw) {
            tracing::error!("Refusing to map {}: path traversal segment", url);
            return Err(PathError::Traversal(url.to_string()));
        }

        let mut lossless = self.same_origin(url) && url.query().is_none();
        let mut relative_dirs = Vec::new();

        if !self.same_host(url) {
            // `host:port` becomes `host_port`
            let mut host_dir = sanitize(&authority).0;
            if host_dir.ends_with(".md") {
                host_dir.push_str("_dir");
            }
            relative_dirs.push(host_dir);
            lossless = false;
        }

        let directory_page = url.path().ends_with('/') || raw.is_empty();
        let (dir_segments, last) = if directory_page {
            (&raw[..], None)
        } else {
            (&raw[..raw.len() - 1], raw.last().copied())
        };

        for segment in dir_segments {
            let (mut clean, altered) = sanitize(segment);
            lossless &= !altered;
            // A directory must never share a name with a page file
            if clean.ends_with(".md") {
                clean.push_str("_dir");
                lossless = false;
            }
            relative_dirs.push(clean);
        }

        let mut stem = match last {
            Some(segment) => {
                let (clean, altered) = sanitize(segment);
                // Only a trailing slash may produce a plain `index`
                lossless &= !altered && clean != "index";
                clean
            }
            None => "index".to_string(),
        };

        if !lossless {
            stem.push('~');
            stem.push_str(&url_hash(url));
        }

        Ok(FileTarget {
            url: url.clone(),
            relative_dirs,
            file_name: format!("{}.md", stem),
        })
    }
}
