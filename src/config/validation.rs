use crate::config::types::{Config, CrawlerConfig, FilterConfig, FilterVariant, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for the dispatcher ceiling
const MAX_CONCURRENCY: u32 = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_filter_config(&config.filter)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the seed URL given on the command line and parses it
pub fn validate_seed(seed: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(url)
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.concurrency_floor < 1 {
        return Err(ConfigError::Validation(format!(
            "concurrency_floor must be >= 1, got {}",
            config.concurrency_floor
        )));
    }

    if config.concurrency_ceiling < config.concurrency_floor
        || config.concurrency_ceiling > MAX_CONCURRENCY
    {
        return Err(ConfigError::Validation(format!(
            "concurrency_ceiling must be between concurrency_floor ({}) and {}, got {}",
            config.concurrency_floor, MAX_CONCURRENCY, config.concurrency_ceiling
        )));
    }

    if !(config.pressure_threshold > 0.0 && config.pressure_threshold <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "pressure_threshold must be in (0, 1], got {}",
            config.pressure_threshold
        )));
    }

    if !(config.recover_threshold > 0.0 && config.recover_threshold < config.pressure_threshold) {
        return Err(ConfigError::Validation(format!(
            "recover_threshold must be in (0, pressure_threshold), got {}",
            config.recover_threshold
        )));
    }

    if config.sample_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "sample_interval_ms must be >= 10ms, got {}ms",
            config.sample_interval_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Ok(())
}

/// Validates content filter configuration
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.threshold) {
        return Err(ConfigError::Validation(format!(
            "filter threshold must be in [0, 1], got {}",
            config.threshold
        )));
    }

    if !(0.0..=1.0).contains(&config.max_link_density) {
        return Err(ConfigError::Validation(format!(
            "max_link_density must be in [0, 1], got {}",
            config.max_link_density
        )));
    }

    if config.variant == FilterVariant::Model {
        let has_key = config
            .model
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        if !has_key {
            return Err(ConfigError::Validation(
                "an API key is required for model-based filtering (--openai-key or OPENAI_API_KEY)"
                    .to_string(),
            ));
        }

        Url::parse(&config.model.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid model endpoint: {}", e))
        })?;

        if config.model.chunk_token_threshold < 1 {
            return Err(ConfigError::Validation(
                "chunk_token_threshold must be >= 1".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    let name = config.doc_name.trim();
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "doc_name cannot be empty".to_string(),
        ));
    }

    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ConfigError::Validation(format!(
            "doc_name must be a plain folder name, got '{}'",
            config.doc_name
        )));
    }

    Ok(())
}
