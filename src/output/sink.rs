//! Writing pages to disk
//!
//! A [`PageSink`] is shared by every worker of a crawl. In tree mode each
//! page is written to its own file as soon as it is ready; in single mode
//! pages are collected and written as one document when the crawl finishes.

use crate::config::{OutputConfig, OutputMode};
use crate::output::markdown::{format_single_document, format_summary};
use crate::output::path_mapper::FileTarget;
use crate::output::stats::CrawlStatistics;
use crate::output::traits::{OutputError, OutputResult, PageDocument, WrittenPage};
use crate::DocsError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Index written next to a page tree
pub const SUMMARY_FILE: &str = "SUMMARY.md";

/// Combined document written in single mode
pub const SINGLE_FILE: &str = "index.md";

/// Destination for converted pages
#[derive(Debug)]
pub enum PageSink {
    Tree(TreeSink),
    Single(SingleSink),
}

#[derive(Debug)]
pub struct TreeSink {
    root: PathBuf,
}

#[derive(Debug)]
pub struct SingleSink {
    root: PathBuf,
    sections: Mutex<Vec<PageDocument>>,
}

impl PageSink {
    pub fn new(mode: OutputMode, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        match mode {
            OutputMode::Tree => PageSink::Tree(TreeSink { root }),
            OutputMode::Single => PageSink::Single(SingleSink {
                root,
                sections: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn mode(&self) -> OutputMode {
        match self {
            PageSink::Tree(_) => OutputMode::Tree,
            PageSink::Single(_) => OutputMode::Single,
        }
    }

    pub fn root(&self) -> &Path {
        match self {
            PageSink::Tree(sink) => &sink.root,
            PageSink::Single(sink) => &sink.root,
        }
    }

    /// Writes or records one page
    ///
    /// Tree mode requires a target and returns its link path. Single mode
    /// ignores the target and returns the shared document's name.
    pub async fn write_page(
        &self,
        target: Option<&FileTarget>,
        doc: PageDocument,
    ) -> OutputResult<String> {
        match self {
            PageSink::Tree(sink) => {
                let target = target.ok_or_else(|| {
                    OutputError::Write {
                        path: doc.url.to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            "no file target for page",
                        ),
                    }
                })?;
                sink.write(target, &doc).await?;
                Ok(target.link_path())
            }
            PageSink::Single(sink) => {
                sink.push(doc);
                Ok(SINGLE_FILE.to_string())
            }
        }
    }

    /// Writes the closing document and returns its path
    ///
    /// In tree mode this is the summary; an existing `SUMMARY.md` (for
    /// example a page mapped there) is left alone and `None` is returned.
    pub async fn finish(
        &self,
        pages: &[WrittenPage],
        stats: &CrawlStatistics,
    ) -> OutputResult<Option<PathBuf>> {
        match self {
            PageSink::Tree(sink) => {
                let path = sink.root.join(SUMMARY_FILE);
                match create_file(&path, format_summary(pages, stats).as_bytes()).await {
                    Ok(()) => Ok(Some(path)),
                    Err(OutputError::AlreadyExists(existing)) => {
                        tracing::warn!("{} already exists, not writing the summary", existing);
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
            PageSink::Single(sink) => {
                let document = {
                    let sections = sink.sections.lock().unwrap_or_else(|e| e.into_inner());
                    format_single_document(&sections)
                };
                let path = sink.root.join(SINGLE_FILE);
                create_file(&path, document.as_bytes()).await?;
                Ok(Some(path))
            }
        }
    }
}

impl TreeSink {
    async fn write(&self, target: &FileTarget, doc: &PageDocument) -> OutputResult<()> {
        let path = target.resolve(&self.root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| OutputError::Write {
                    path: parent.display().to_string(),
                    source,
                })?;
        }

        let body = format!("# {}\n\n{}", doc.title, doc.markdown);
        create_file(&path, body.as_bytes()).await?;

        tracing::debug!("Wrote {} to {}", doc.url, path.display());
        Ok(())
    }
}

impl SingleSink {
    fn push(&self, doc: PageDocument) {
        self.sections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(doc);
    }
}

/// Creates a new file, failing if anything already exists at `path`
async fn create_file(path: &Path, contents: &[u8]) -> OutputResult<()> {
    let display = path.display().to_string();
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                OutputError::AlreadyExists(display.clone())
            } else {
                OutputError::Write {
                    path: display.clone(),
                    source,
                }
            }
        })?;

    file.write_all(contents)
        .await
        .map_err(|source| OutputError::Write {
            path: display.clone(),
            source,
        })?;
    file.flush().await.map_err(|source| OutputError::Write {
        path: display,
        source,
    })?;
    Ok(())
}

/// Prepares the documentation folder before crawling
///
/// A missing folder is created. An existing non-empty folder is an error
/// unless `overwrite` is set, in which case it is removed and recreated.
pub fn prepare_output_root(config: &OutputConfig) -> Result<PathBuf, DocsError> {
    let root = config.root();
    let invalid = |reason: String| DocsError::OutputRoot {
        path: root.display().to_string(),
        reason,
    };

    if root.exists() {
        if !root.is_dir() {
            return Err(invalid("exists and is not a directory".to_string()));
        }

        let non_empty = std::fs::read_dir(&root)?.next().is_some();
        if non_empty {
            if !config.overwrite {
                return Err(invalid(
                    "directory is not empty (use --overwrite to replace it)".to_string(),
                ));
            }
            tracing::warn!("Removing existing output directory {}", root.display());
            std::fs::remove_dir_all(&root)?;
        }
    }

    std::fs::create_dir_all(&root)?;
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::path_mapper::PathMapper;
    use tempfile::TempDir;
    use url::Url;

    fn doc(url: &str, title: &str, depth: u32, sequence: usize) -> PageDocument {
        PageDocument {
            url: Url::parse(url).unwrap(),
            title: title.to_string(),
            markdown: format!("{} content\n", title),
            depth,
            sequence,
        }
    }

    fn output_config(dir: &TempDir, overwrite: bool) -> OutputConfig {
        OutputConfig {
            directory: dir.path().display().to_string(),
            doc_name: "site".to_string(),
            mode: OutputMode::Tree,
            overwrite,
        }
    }

    #[tokio::test]
    async fn test_tree_sink_writes_page_file() {
        let dir = TempDir::new().unwrap();
        let sink = PageSink::new(OutputMode::Tree, dir.path());
        let seed = Url::parse("https://ex.com/docs").unwrap();
        let mapper = PathMapper::new(&seed);
        let target = mapper
            .map_to_path(&Url::parse("https://ex.com/docs/intro").unwrap())
            .unwrap();

        let path = sink
            .write_page(Some(&target), doc("https://ex.com/docs/intro", "Intro", 1, 1))
            .await
            .unwrap();

        assert_eq!(path, "docs/intro.md");
        let written = std::fs::read_to_string(dir.path().join("docs/intro.md")).unwrap();
        assert_eq!(written, "# Intro\n\nIntro content\n");
    }

    #[tokio::test]
    async fn test_tree_sink_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let sink = PageSink::new(OutputMode::Tree, dir.path());
        let mapper = PathMapper::new(&Url::parse("https://ex.com/").unwrap());
        let target = mapper
            .map_to_path(&Url::parse("https://ex.com/a").unwrap())
            .unwrap();

        sink.write_page(Some(&target), doc("https://ex.com/a", "A", 1, 1))
            .await
            .unwrap();
        let second = sink
            .write_page(Some(&target), doc("https://ex.com/a", "Other", 1, 2))
            .await;

        assert!(matches!(second, Err(OutputError::AlreadyExists(_))));
        let written = std::fs::read_to_string(dir.path().join("a.md")).unwrap();
        assert!(written.starts_with("# A"));
    }

    #[tokio::test]
    async fn test_tree_sink_requires_target() {
        let dir = TempDir::new().unwrap();
        let sink = PageSink::new(OutputMode::Tree, dir.path());
        let result = sink
            .write_page(None, doc("https://ex.com/a", "A", 0, 0))
            .await;
        assert!(matches!(result, Err(OutputError::Write { .. })));
    }

    #[tokio::test]
    async fn test_tree_finish_writes_summary() {
        let dir = TempDir::new().unwrap();
        let sink = PageSink::new(OutputMode::Tree, dir.path());
        let pages = vec![WrittenPage {
            url: Url::parse("https://ex.com/docs").unwrap(),
            title: "Docs".to_string(),
            path: "docs.md".to_string(),
            depth: 0,
            sequence: 0,
        }];

        let path = sink
            .finish(&pages, &CrawlStatistics::new())
            .await
            .unwrap()
            .unwrap();
        let summary = std::fs::read_to_string(path).unwrap();
        assert!(summary.contains("- [Docs](docs.md)"));
    }

    #[tokio::test]
    async fn test_tree_finish_keeps_existing_summary() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SUMMARY_FILE), "page content").unwrap();
        let sink = PageSink::new(OutputMode::Tree, dir.path());

        let result = sink.finish(&[], &CrawlStatistics::new()).await.unwrap();
        assert!(result.is_none());
        let kept = std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert_eq!(kept, "page content");
    }

    #[tokio::test]
    async fn test_single_sink_orders_sections() {
        let dir = TempDir::new().unwrap();
        let sink = PageSink::new(OutputMode::Single, dir.path());

        sink.write_page(None, doc("https://ex.com/b", "B", 1, 2))
            .await
            .unwrap();
        sink.write_page(None, doc("https://ex.com/", "Root", 0, 0))
            .await
            .unwrap();
        sink.write_page(None, doc("https://ex.com/a", "A", 1, 1))
            .await
            .unwrap();

        let path = sink
            .finish(&[], &CrawlStatistics::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join(SINGLE_FILE));

        let document = std::fs::read_to_string(path).unwrap();
        let root = document.find("# Root").unwrap();
        let a = document.find("# A").unwrap();
        let b = document.find("# B").unwrap();
        assert!(root < a && a < b);
        assert_eq!(document.matches("\n---\n").count(), 3);
    }

    #[test]
    fn test_prepare_creates_missing_root() {
        let dir = TempDir::new().unwrap();
        let root = prepare_output_root(&output_config(&dir, false)).unwrap();
        assert!(root.is_dir());
        assert_eq!(root, dir.path().join("site"));
    }

    #[test]
    fn test_prepare_accepts_empty_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        assert!(prepare_output_root(&output_config(&dir, false)).is_ok());
    }

    #[test]
    fn test_prepare_rejects_non_empty_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("site/old.md"), "old").unwrap();

        let err = prepare_output_root(&output_config(&dir, false)).unwrap_err();
        assert!(matches!(err, DocsError::OutputRoot { .. }));
        assert!(dir.path().join("site/old.md").exists());
    }

    #[test]
    fn test_prepare_overwrite_clears_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("site/old.md"), "old").unwrap();

        let root = prepare_output_root(&output_config(&dir, true)).unwrap();
        assert!(root.is_dir());
        assert!(!root.join("old.md").exists());
    }

    #[test]
    fn test_prepare_rejects_file_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("site"), "not a dir").unwrap();
        assert!(prepare_output_root(&output_config(&dir, true)).is_err());
    }
}
