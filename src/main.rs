//! docs-to-markdown main entry point
//!
//! This is the command-line interface for mirroring a documentation site as
//! Markdown.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use docs_to_markdown::config::{
    apply_overrides, load_config_with_hash, validate_seed, Config, FilterVariant, OutputMode,
    Overrides,
};
use docs_to_markdown::crawler::crawl;
use docs_to_markdown::output::print_statistics;
use docs_to_markdown::url::LinkPolicy;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docs-to-markdown: mirror a documentation site as Markdown
///
/// Crawls breadth-first from the seed URL, stays on the seed's site, keeps
/// the substantive content of every page and writes it as Markdown.
#[derive(Parser, Debug)]
#[command(name = "docs-to-markdown")]
#[command(version)]
#[command(about = "Mirror a documentation site as Markdown", long_about = None)]
struct Cli {
    /// URL the crawl starts from
    #[arg(value_name = "URL")]
    seed: String,

    /// Folder name for this documentation set
    #[arg(long)]
    doc_name: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of link hops from the seed
    #[arg(short = 'd', long)]
    max_depth: Option<u32>,

    /// Directory that receives the documentation folder
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Output layout
    #[arg(long, value_enum)]
    output: Option<OutputArg>,

    /// Filter content with a language model instead of heuristics
    #[arg(long)]
    llm_filtering: bool,

    /// API key for model-based filtering
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_key: Option<String>,

    /// Replace an existing, non-empty documentation folder
    #[arg(long)]
    overwrite: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputArg {
    /// One file per page, mirroring the site's paths
    Tree,
    /// All pages in a single index.md
    Single,
}

impl From<OutputArg> for OutputMode {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Tree => OutputMode::Tree,
            OutputArg::Single => OutputMode::Single,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let overrides = Overrides {
        max_depth: cli.max_depth,
        output_dir: cli.output_dir.clone(),
        doc_name: cli.doc_name.clone(),
        mode: cli.output.map(OutputMode::from),
        llm_filtering: cli.llm_filtering,
        api_key: cli.openai_key.clone(),
        overwrite: cli.overwrite,
    };
    let config = apply_overrides(config, &overrides).context("Invalid configuration")?;

    let seed = validate_seed(&cli.seed).context("Invalid seed URL")?;
    let seed = LinkPolicy::new(seed.clone(), &config.crawler)
        .normalize(seed.as_str(), None)
        .context("Invalid seed URL")?;

    if cli.dry_run {
        handle_dry_run(&config, &seed);
        return Ok(());
    }

    handle_crawl(&config, &seed).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docs_to_markdown=info,warn"),
            1 => EnvFilter::new("docs_to_markdown=debug,info"),
            2 => EnvFilter::new("docs_to_markdown=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config, seed: &url::Url) {
    println!("=== docs-to-markdown Dry Run ===\n");

    println!("Seed: {}", seed);

    println!("\nCrawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Concurrency: {}..{}",
        config.crawler.concurrency_floor, config.crawler.concurrency_ceiling
    );
    println!(
        "  Memory pressure thresholds: shrink above {:.2}, grow below {:.2}",
        config.crawler.pressure_threshold, config.crawler.recover_threshold
    );
    println!("  Include subdomains: {}", config.crawler.include_subdomains);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);

    println!("\nFilter:");
    match config.filter.variant {
        FilterVariant::Heuristic => {
            println!("  Variant: heuristic");
            println!("  Threshold: {}", config.filter.threshold);
        }
        FilterVariant::Model => {
            println!("  Variant: model ({})", config.filter.model.model);
            println!("  Endpoint: {}", config.filter.model.endpoint);
        }
    }

    println!("\nOutput:");
    println!("  Folder: {}", config.output.root().display());
    println!("  Mode: {:?}", config.output.mode);
    println!("  Overwrite: {}", config.output.overwrite);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, seed: &url::Url) -> anyhow::Result<()> {
    let report = crawl(config, seed)
        .await
        .with_context(|| format!("Crawl of {} failed", seed))?;

    if report.interrupted {
        tracing::warn!("Crawl was interrupted; output is partial");
    }
    if let Some(path) = &report.summary_path {
        tracing::info!("Index written to {}", path.display());
    }

    print_statistics(&report.stats);
    Ok(())
}
