use serde::Deserialize;

/// Main configuration structure for docs-to-markdown
///
/// Every section is optional in the TOML file; missing values take the
/// defaults below. The seed URL always comes from the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of link hops from the seed URL
    pub max_depth: u32,

    /// Lowest concurrency window the dispatcher may shrink to
    pub concurrency_floor: u32,

    /// Highest concurrency window the dispatcher may grow to
    pub concurrency_ceiling: u32,

    /// Memory pressure (0..1) above which the window shrinks
    pub pressure_threshold: f64,

    /// Memory pressure (0..1) below which the window grows again
    pub recover_threshold: f64,

    /// How often the resource signal is sampled (milliseconds)
    pub sample_interval_ms: u64,

    /// Treat subdomains of the seed host as the same site
    pub include_subdomains: bool,

    /// Keep the query string as part of a URL's identity
    pub query_identity: bool,

    /// Remove utm_* and similar tracking parameters during normalization
    pub strip_tracking_params: bool,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            concurrency_floor: 1,
            concurrency_ceiling: 5,
            pressure_threshold: 0.90,
            recover_threshold: 0.75,
            sample_interval_ms: 500,
            include_subdomains: false,
            query_identity: true,
            strip_tracking_params: true,
            request_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "docs-to-markdown".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Which content filter runs for the whole crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterVariant {
    #[default]
    Heuristic,
    Model,
}

/// Content filter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FilterConfig {
    pub variant: FilterVariant,

    /// Minimum score a leaf block needs to be kept
    pub threshold: f64,

    /// Link clusters with fewer non-link words than this are dropped
    pub min_words: usize,

    /// Containers above this link density are treated as navigation
    pub max_link_density: f64,

    pub model: ModelConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            variant: FilterVariant::Heuristic,
            threshold: 0.5,
            min_words: 3,
            max_link_density: 0.5,
            model: ModelConfig::default(),
        }
    }
}

/// Language-model classifier configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,

    pub model: String,

    /// System prompt sent with every block
    pub instruction: String,

    /// Approximate token budget for one classified chunk
    pub chunk_token_threshold: usize,

    pub timeout_secs: u64,

    /// API key; normally supplied through `--openai-key` or `OPENAI_API_KEY`
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            instruction: "You decide whether a block of HTML taken from a documentation page is \
                          essential documentation content. Menus, sidebars, footers, cookie \
                          notices and any other irrelevant sections are not. Answer with the \
                          single word KEEP or DROP."
                .to_string(),
            chunk_token_threshold: 1500,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Layout of the written Markdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// One file per page, mirroring the URL path structure
    #[default]
    Tree,
    /// Every page as a section of a single index.md
    Single,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory that receives the documentation folder
    pub directory: String,

    /// Folder name for this documentation set
    pub doc_name: String,

    pub mode: OutputMode,

    /// Remove an existing, non-empty documentation folder before crawling
    pub overwrite: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            doc_name: "docs".to_string(),
            mode: OutputMode::Tree,
            overwrite: false,
        }
    }
}

impl OutputConfig {
    /// The directory every page is written under
    pub fn root(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.directory).join(&self.doc_name)
    }
}
