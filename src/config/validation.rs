use crate::config::types::{
    Config, FilterSettings, OutputSettings, PipelineSettings, ProviderSettings, RetrySettings,
    SearchSettings, SegmentEntry,
};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
///
/// Missing credentials are collected and reported together so a first-time
/// user sees every key they still need to set.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    check_required_keys(config)?;
    validate_provider(&config.provider)?;
    validate_search(&config.search)?;
    validate_pipeline(&config.pipeline)?;
    validate_retry(&config.retry)?;
    validate_output(&config.output)?;
    validate_filter(&config.filter)?;
    if !config.is_single_url_mode() {
        validate_segments(&config.segments)?;
    }
    Ok(())
}

/// Validates the HTTP trigger settings on top of [`validate`]
///
/// The server refuses to start without a shared key.
pub fn validate_server(config: &Config) -> Result<(), ConfigError> {
    if is_blank(&config.server.api_key) {
        return Err(ConfigError::MissingKeys(vec!["MY_SHARED_API_KEY".to_string()]));
    }

    config
        .server
        .bind
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidValue {
            key: "server.bind".to_string(),
            message: format!("'{}': {}", config.server.bind, e),
        })?;

    if config.server.max_cached_jobs == 0 {
        return Err(ConfigError::Validation(
            "server.max-cached-jobs must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn check_required_keys(config: &Config) -> Result<(), ConfigError> {
    let kind = config.provider.kind()?;
    let mut missing = Vec::new();

    if let Some(env_key) = kind.api_key_env() {
        if is_blank(&config.provider.api_key) {
            missing.push(env_key.to_string());
        }
    }

    if !config.is_single_url_mode() && is_blank(&config.search.api_key) {
        missing.push("SERPER_API_KEY".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingKeys(missing))
    }
}

fn validate_provider(config: &ProviderSettings) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::Validation(format!(
            "temperature must be between 0.0 and 2.0, got {}",
            config.temperature
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if let Some(base) = &config.api_base {
        Url::parse(base).map_err(|e| ConfigError::InvalidValue {
            key: "api_base".to_string(),
            message: e.to_string(),
        })?;
    }

    Ok(())
}

fn validate_search(config: &SearchSettings) -> Result<(), ConfigError> {
    if config.results_per_query < 1 || config.results_per_query > 100 {
        return Err(ConfigError::Validation(format!(
            "results_per_query must be between 1 and 100, got {}",
            config.results_per_query
        )));
    }

    if config.max_urls < 1 {
        return Err(ConfigError::Validation(
            "max_urls must be >= 1".to_string(),
        ));
    }

    Url::parse(&config.endpoint).map_err(|e| ConfigError::InvalidValue {
        key: "search endpoint".to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

fn validate_pipeline(config: &PipelineSettings) -> Result<(), ConfigError> {
    if config.max_candidates < 1 {
        return Err(ConfigError::Validation(
            "max_candidates must be >= 1".to_string(),
        ));
    }

    if config.scrape_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "scrape_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_page_chars < 500 {
        return Err(ConfigError::Validation(format!(
            "max_page_chars must be >= 500, got {}",
            config.max_page_chars
        )));
    }

    if let Some(test_url) = &config.test_url {
        let url = Url::parse(test_url).map_err(|e| ConfigError::InvalidValue {
            key: "TEST_URL".to_string(),
            message: e.to_string(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "TEST_URL must use http or https, got '{}'",
                test_url
            )));
        }
    }

    Ok(())
}

fn validate_retry(config: &RetrySettings) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if !config.delay_secs.is_finite() || config.delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "retry delay must be a non-negative number of seconds, got {}",
            config.delay_secs
        )));
    }

    if !config.backoff.is_finite() || config.backoff < 1.0 {
        return Err(ConfigError::Validation(format!(
            "retry backoff must be >= 1.0, got {}",
            config.backoff
        )));
    }

    Ok(())
}

fn validate_output(config: &OutputSettings) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_filter(config: &FilterSettings) -> Result<(), ConfigError> {
    for pattern in &config.exclude_domains {
        validate_domain_pattern(pattern)?;
    }
    Ok(())
}

fn validate_segments(segments: &[SegmentEntry]) -> Result<(), ConfigError> {
    if segments.is_empty() {
        return Err(ConfigError::Validation(
            "at least one segment is required".to_string(),
        ));
    }

    for segment in segments {
        if segment.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "segment name cannot be empty".to_string(),
            ));
        }

        if segment.queries.iter().all(|q| q.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "Segment '{}' must have at least one search query",
                segment.name
            )));
        }
    }

    Ok(())
}

/// Validates an exclusion pattern: a bare domain or `*.` followed by one
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() || domain.contains('*') {
        return Err(ConfigError::InvalidPattern(format!(
            "'{}': wildcards are only allowed as a leading '*.'",
            pattern
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "'{}': domain must contain at least one dot",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "'{}': domain contains invalid characters",
            pattern
        )));
    }

    Ok(())
}
