//! Shared state of the HTTP trigger

use crate::config::Config;
use crate::pipeline::Services;
use crate::{ConfigError, ConfigResult};
use axum::http::{HeaderMap, StatusCode};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Header carrying the shared key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Builds the collaborators of one run from its configuration
pub type ServicesFactory = Arc<dyn Fn(&Config) -> crate::Result<Services> + Send + Sync>;

/// Finished CSV reports by job id, oldest evicted first
#[derive(Debug)]
pub struct JobCache {
    files: HashMap<String, Vec<u8>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl JobCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            files: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&mut self, job_id: String, csv: Vec<u8>) {
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                tracing::debug!("Evicting cached result {}", oldest);
                self.files.remove(&oldest);
            }
        }
        self.order.push_back(job_id.clone());
        self.files.insert(job_id, csv);
    }

    pub fn get(&self, job_id: &str) -> Option<&[u8]> {
        self.files.get(job_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Base configuration; each run narrows a clone to its segments
    config: Arc<Config>,
    api_key: String,
    services: ServicesFactory,
    jobs: RwLock<JobCache>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKeys` when no shared key is configured.
    pub fn new(config: Arc<Config>, services: ServicesFactory) -> ConfigResult<Self> {
        let api_key = config
            .server
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKeys(vec!["MY_SHARED_API_KEY".to_string()]))?;
        let jobs = RwLock::new(JobCache::new(config.server.max_cached_jobs));

        Ok(Self {
            config,
            api_key,
            services,
            jobs,
        })
    }

    /// State whose runs use the real search, scraping and reasoning clients
    pub fn from_config(config: Arc<Config>) -> ConfigResult<Self> {
        Self::new(config, Arc::new(Services::from_config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn build_services(&self, config: &Config) -> crate::Result<Services> {
        (self.services)(config)
    }

    /// Checks the shared key header
    ///
    /// A missing key is `401 Unauthorized`, a wrong one `403 Forbidden`.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), StatusCode> {
        match headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
            None => Err(StatusCode::UNAUTHORIZED),
            Some(key) if key.trim().is_empty() => Err(StatusCode::UNAUTHORIZED),
            Some(key) if key == self.api_key => Ok(()),
            Some(_) => Err(StatusCode::FORBIDDEN),
        }
    }

    pub async fn store_result(&self, job_id: String, csv: Vec<u8>) {
        self.jobs.write().await.insert(job_id, csv);
    }

    pub async fn result(&self, job_id: &str) -> Option<Vec<u8>> {
        self.jobs.read().await.get(job_id).map(<[u8]>::to_vec)
    }
}
