//! Serper web search client

use crate::config::SearchSettings;
use crate::services::{SearchHit, SearchService, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Google search through the Serper API
pub struct SerperClient {
    client: Client,
    api_key: String,
    endpoint: String,
    results_per_query: u32,
    country: String,
}

impl std::fmt::Debug for SerperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerperClient")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("results_per_query", &self.results_per_query)
            .finish()
    }
}

impl SerperClient {
    pub fn new(
        api_key: impl Into<String>,
        settings: &SearchSettings,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            results_per_query: settings.results_per_query,
            country: settings.country.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: u32,
    gl: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    link: Option<String>,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchService for SerperClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        let url = format!("{}/search", self.endpoint);
        tracing::debug!("Searching: {}", query);

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest {
                q: query,
                num: self.results_per_query,
                gl: &self.country,
            })
            .send()
            .await
            .map_err(|e| ServiceError::from_transport("serper", &e, SEARCH_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status("serper", status, &body, SEARCH_TIMEOUT));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("serper response: {}", e)))?;

        let hits: Vec<SearchHit> = body
            .organic
            .into_iter()
            .filter_map(|r| {
                r.link.map(|url| SearchHit {
                    title: r.title,
                    url,
                    snippet: r.snippet,
                })
            })
            .collect();

        tracing::info!("Search '{}' returned {} results", query, hits.len());
        Ok(hits)
    }

    fn name(&self) -> &str {
        "serper"
    }
}
