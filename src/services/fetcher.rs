//! HTTP page fetcher
//!
//! This module handles page requests for extraction and contact discovery:
//! - Building an HTTP client with a browser user agent
//! - GET requests with a per-request timeout
//! - Redirect following (at most 5 hops)
//! - Error classification into transient and permanent failures

use crate::services::parser::parse_html;
use crate::services::{FetchErrorKind, FetchedPage, PageFetcher, ServiceError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Sites routinely block non-browser user agents
pub const BROWSER_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
);

/// Builds an HTTP client for page fetching
///
/// # Arguments
///
/// * `timeout` - Total per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sponsor_scout::services::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(Duration::from_secs(20)).unwrap();
/// ```
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(5))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over HTTP and parses them
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeout)?,
            timeout,
        })
    }

    fn fetch_error(url: &str, kind: FetchErrorKind) -> ServiceError {
        ServiceError::Fetch {
            url: url.to_string(),
            kind,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    /// Fetches a URL with full error classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 404 / 410 | NotFound (permanent) |
    /// | HTTP 401 / 403 / 451 | Blocked (permanent) |
    /// | HTTP 429 | RateLimited (transient) |
    /// | HTTP 5xx | Status (transient) |
    /// | Timeout | Timeout (transient) |
    /// | Connection failure | Network (transient) |
    /// | Non-HTML Content-Type | ContentMismatch (permanent) |
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ServiceError> {
        let parsed_url =
            Url::parse(url).map_err(|e| ServiceError::InvalidUrl(format!("{}: {}", url, e)))?;

        tracing::debug!("Fetching {}", url);

        let response = match self.client.get(parsed_url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(Self::fetch_error(url, FetchErrorKind::Timeout)),
            Err(e) if e.is_redirect() => {
                tracing::debug!("Redirect failure for {}: {}", url, e);
                return Err(Self::fetch_error(url, FetchErrorKind::Blocked));
            }
            Err(e) => {
                tracing::debug!("Network error for {}: {}", url, e);
                return Err(Self::fetch_error(url, FetchErrorKind::Network));
            }
        };

        let status = response.status();
        let final_url = response.url().clone();

        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(Self::fetch_error(url, FetchErrorKind::NotFound));
        }

        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS
        {
            return Err(Self::fetch_error(url, FetchErrorKind::Blocked));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited(format!("{} returned 429", url)));
        }

        if !status.is_success() {
            return Err(Self::fetch_error(url, FetchErrorKind::Status(status.as_u16())));
        }

        // Check Content-Type; a missing header is given the benefit of the doubt
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if !content_type.is_empty()
            && !content_type.contains("text/html")
            && !content_type.contains("application/xhtml")
            && !content_type.contains("text/plain")
        {
            tracing::debug!("Skipping {} with content type {}", url, content_type);
            return Err(Self::fetch_error(url, FetchErrorKind::ContentMismatch));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::from_transport(url, &e, self.timeout))?;

        let parsed = parse_html(&body, &final_url);

        tracing::debug!(
            "Fetched {} ({} chars of text, {} links)",
            final_url,
            parsed.text.len(),
            parsed.links.len()
        );

        Ok(FetchedPage {
            final_url: final_url.to_string(),
            title: parsed.title,
            text: parsed.text,
            links: parsed.links,
            mailto: parsed.mailto,
        })
    }
}
