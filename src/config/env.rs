//! Environment overlay for the configuration
//!
//! Values come through a lookup function so callers decide where the
//! environment lives: `std::env` for the binary, a map in tests.

use crate::config::types::{Config, ProviderKind};
use crate::{ConfigError, ConfigResult};
use std::str::FromStr;

/// Applies environment overrides on top of `config`
///
/// Empty values are treated as unset. The provider key is applied first so
/// that the per-provider API key and model variables are read for the
/// provider that will actually be used.
pub fn apply_env<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(name) = get("LLM_PROVIDER") {
        config.provider.name = name;
    }

    let kind: ProviderKind = config.provider.name.parse()?;
    if let Some(env_key) = kind.api_key_env() {
        if let Some(key) = get(env_key) {
            config.provider.api_key = Some(key);
        }
    }
    if let Some(model) = get(kind.model_env()) {
        config.provider.model = Some(model);
    }
    if kind == ProviderKind::Ollama {
        if let Some(base) = get("OLLAMA_BASE_URL") {
            config.provider.api_base = Some(base);
        }
    }
    if let Some(base) = get("LLM_API_BASE") {
        config.provider.api_base = Some(base);
    }
    if let Some(v) = get("LLM_TEMPERATURE") {
        config.provider.temperature = parse_value("LLM_TEMPERATURE", &v)?;
    }
    if let Some(v) = get("LLM_REQUEST_TIMEOUT") {
        config.provider.request_timeout_secs = parse_value("LLM_REQUEST_TIMEOUT", &v)?;
    }

    if let Some(key) = get("SERPER_API_KEY") {
        config.search.api_key = Some(key);
    }
    if let Some(v) = get("SEARCH_RESULTS_PER_QUERY") {
        config.search.results_per_query = parse_value("SEARCH_RESULTS_PER_QUERY", &v)?;
    }
    if let Some(v) = get("MAX_URLS_TO_PROCESS") {
        config.search.max_urls = parse_value("MAX_URLS_TO_PROCESS", &v)?;
    }

    if let Some(v) = get("MAX_CANDIDATES_PER_RUN") {
        config.pipeline.max_candidates = parse_value("MAX_CANDIDATES_PER_RUN", &v)?;
    }
    if let Some(v) = get("SCRAPER_REQUEST_TIMEOUT") {
        config.pipeline.scrape_timeout_secs = parse_value("SCRAPER_REQUEST_TIMEOUT", &v)?;
    }
    if let Some(url) = get("TEST_URL") {
        config.pipeline.test_url = Some(url);
    }

    if let Some(v) = get("API_RETRY_ATTEMPTS") {
        config.retry.max_attempts = parse_value("API_RETRY_ATTEMPTS", &v)?;
    }
    if let Some(v) = get("API_RETRY_DELAY") {
        config.retry.delay_secs = parse_value("API_RETRY_DELAY", &v)?;
    }
    if let Some(v) = get("API_RETRY_BACKOFF") {
        config.retry.backoff = parse_value("API_RETRY_BACKOFF", &v)?;
    }

    if let Some(path) = get("OUTPUT_PATH") {
        config.output.path = path;
    }
    if let Some(level) = get("LOG_LEVEL") {
        config.logging.level = level;
    }

    if let Some(key) = get("MY_SHARED_API_KEY") {
        config.server.api_key = Some(key);
    }
    // PORT is what hosting platforms set; an explicit SERVER_BIND wins
    if let Some(port) = get("PORT") {
        let port: u16 = parse_value("PORT", &port)?;
        config.server.bind = format!("0.0.0.0:{}", port);
    }
    if let Some(bind) = get("SERVER_BIND") {
        config.server.bind = bind;
    }

    Ok(())
}

/// Reads a variable from the process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_value<T>(key: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{}': {}", raw, e),
    })
}
