use crate::config::types::{Config, FilterVariant, OutputMode};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Values given on the command line that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_depth: Option<u32>,
    pub output_dir: Option<String>,
    pub doc_name: Option<String>,
    pub mode: Option<OutputMode>,
    pub llm_filtering: bool,
    pub api_key: Option<String>,
    pub overwrite: bool,
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use docs_to_markdown::config::load_config;
///
/// let config = load_config(Path::new("docs.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Parses configuration from TOML text without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so two runs can be compared.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

/// Loads a configuration and returns both the config and its hash
///
/// The result is not validated yet: settings such as the API key may still
/// come from the command line, so `apply_overrides` validates the final
/// configuration.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

/// Applies command-line overrides and validates the result
pub fn apply_overrides(mut config: Config, overrides: &Overrides) -> Result<Config, ConfigError> {
    if let Some(depth) = overrides.max_depth {
        config.crawler.max_depth = depth;
    }
    if let Some(dir) = &overrides.output_dir {
        config.output.directory = dir.clone();
    }
    if let Some(name) = &overrides.doc_name {
        config.output.doc_name = name.clone();
    }
    if let Some(mode) = overrides.mode {
        config.output.mode = mode;
    }
    if overrides.llm_filtering {
        config.filter.variant = FilterVariant::Model;
    }
    // Command line beats the file
    if let Some(key) = &overrides.api_key {
        config.filter.model.api_key = Some(key.clone());
    }
    if overrides.overwrite {
        config.output.overwrite = true;
    }

    validate(&config)?;
    Ok(config)
}
