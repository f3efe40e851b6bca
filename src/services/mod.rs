//! External collaborators: web search, page fetching and reasoning providers
//!
//! The pipeline depends only on the traits in this module. Concrete
//! implementations talk HTTP; tests substitute in-memory stubs.

mod fetcher;
mod json;
pub mod llm;
mod parser;
mod search;

pub use fetcher::{build_http_client, HttpFetcher, BROWSER_USER_AGENT};
pub use json::{extract_json, strip_code_fences};
pub use llm::{create_reasoning_client, Prompt, ReasoningClient, SharedReasoner};
pub use parser::{parse_html, ParsedPage, PageLink};
pub use search::SerperClient;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a page fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    Blocked,
    NotFound,
    /// Non-HTML content type
    ContentMismatch,
    /// Unexpected HTTP status
    Status(u16),
    Network,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Blocked => f.write_str("blocked"),
            Self::NotFound => f.write_str("not found"),
            Self::ContentMismatch => f.write_str("not an HTML page"),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Network => f.write_str("network error"),
        }
    }
}

/// Failure of an external collaborator call
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("fetch failed for {url}: {kind}")]
    Fetch { url: String, kind: FetchErrorKind },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ServiceError {
    /// Returns true for failures worth retrying: timeouts, rate limits,
    /// overload and connection problems
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited(_) | Self::Unavailable(_) | Self::Network(_) => {
                true
            }
            Self::Fetch { kind, .. } => match kind {
                FetchErrorKind::Timeout | FetchErrorKind::Network => true,
                FetchErrorKind::Status(code) => *code >= 500,
                _ => false,
            },
            Self::Rejected(_) | Self::Malformed(_) | Self::InvalidUrl(_) => false,
        }
    }

    /// Maps an unsuccessful HTTP status from an API into an error
    ///
    /// `timeout` is the request timeout reported when the server answers 408.
    pub fn from_status(
        service: &str,
        status: reqwest::StatusCode,
        body: &str,
        timeout: Duration,
    ) -> Self {
        let detail = format!("{} returned {}: {}", service, status, truncate(body, 300));
        match status.as_u16() {
            408 => Self::Timeout(timeout),
            429 => Self::RateLimited(detail),
            500..=599 => Self::Unavailable(detail),
            _ => Self::Rejected(detail),
        }
    }

    /// Maps a transport failure from reqwest into an error
    pub fn from_transport(service: &str, err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_builder() {
            Self::InvalidUrl(format!("{}: {}", service, err))
        } else if err.is_decode() {
            Self::Malformed(format!("{}: {}", service, err))
        } else {
            Self::Network(format!("{}: {}", service, err))
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// One organic web search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Web search collaborator
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Runs one query and returns results in ranking order
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError>;

    fn name(&self) -> &str;
}

/// A fetched and parsed HTML page
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: String,
    pub title: Option<String>,

    /// Visible text with scripts and styles removed
    pub text: String,
    pub links: Vec<PageLink>,

    /// Addresses from `mailto:` links
    pub mailto: Vec<String>,
}

/// Page fetching collaborator
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ServiceError>;
}
