//! Sponsor-Scout: a conference sponsorship lead finder
//!
//! This crate searches the web for companies that are likely conference
//! sponsors, extracts their identities, classifies them as HR-industry or
//! regional B2B leads, enriches each with contact and motivation data, and
//! writes a CSV report. Each website identity is analyzed at most once per run.
//! Runs start from the command line or from the HTTP trigger in [`server`].

pub mod config;
pub mod lead;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sponsor-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] services::ServiceError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("Unknown provider '{0}'. Supported: openai, anthropic, google, mistralai, ollama")]
    UnknownProvider(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sponsor-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use lead::{AnalyzedLead, ClassifiedLead, Classifier, CompanyCandidate, LeadCategory};
pub use pipeline::{Orchestrator, RetryPolicy, Router, RoutingError, RunReport};
pub use state::{ReviewStatus, RunRegistry};
pub use url::{normalize_url, site_identity, SiteIdentity};
