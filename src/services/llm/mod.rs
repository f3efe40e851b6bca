//! Reasoning providers
//!
//! Every provider implements [`ReasoningClient`]; the pipeline never sees a
//! concrete type. [`create_reasoning_client`] picks the implementation from
//! the configured provider key once per run.

mod anthropic;
mod gemini;
mod ollama;
mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiCompatibleProvider;

use crate::config::{ProviderKind, ProviderSettings};
use crate::services::ServiceError;
use crate::ConfigError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A request to a reasoning provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Role and output instructions
    pub system: String,

    /// The task itself
    pub user: String,

    /// Ask the provider for a JSON response where it supports that
    pub expect_json: bool,
}

impl Prompt {
    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            expect_json: true,
        }
    }
}

/// Text-generation client used by extraction, analysis and review
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ServiceError>;

    /// Provider key
    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

/// Thread-safe shared reasoning client
pub type SharedReasoner = Arc<dyn ReasoningClient>;

/// Connection parameters shared by all providers
#[derive(Clone)]
pub struct ClientParams {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl std::fmt::Debug for ClientParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientParams")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientParams {
    /// Resolves model, base URL and key from the provider settings
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: settings
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            api_base: settings.resolved_api_base()?,
            model: settings.resolved_model()?,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: settings.request_timeout(),
        })
    }

    fn require_key(&self, kind: ProviderKind) -> Result<String, ConfigError> {
        self.api_key.clone().ok_or_else(|| {
            ConfigError::MissingKeys(vec![kind
                .api_key_env()
                .unwrap_or("api-key")
                .to_string()])
        })
    }

    fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.timeout).build()
    }
}

/// Creates the reasoning client for the configured provider
///
/// # Errors
///
/// * `ScoutError::Config` - unknown provider key or missing API key
/// * `ScoutError::Reqwest` - the HTTP client could not be built
///
/// # Example
///
/// ```no_run
/// use sponsor_scout::config::ProviderSettings;
/// use sponsor_scout::services::create_reasoning_client;
///
/// let settings = ProviderSettings {
///     name: "ollama".to_string(),
///     ..Default::default()
/// };
/// let client = create_reasoning_client(&settings).unwrap();
/// assert_eq!(client.name(), "ollama");
/// ```
pub fn create_reasoning_client(settings: &ProviderSettings) -> crate::Result<SharedReasoner> {
    let kind = settings.kind()?;
    let params = ClientParams::from_settings(settings)?;

    let client: SharedReasoner = match kind {
        ProviderKind::OpenAi | ProviderKind::MistralAi => {
            let key = params.require_key(kind)?;
            Arc::new(OpenAiCompatibleProvider::new(kind, key, &params)?)
        }
        ProviderKind::Anthropic => {
            let key = params.require_key(kind)?;
            Arc::new(AnthropicProvider::new(key, &params)?)
        }
        ProviderKind::Google => {
            let key = params.require_key(kind)?;
            Arc::new(GeminiProvider::new(key, &params)?)
        }
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(&params)?),
    };

    tracing::info!(
        "Using reasoning provider {} (model: {}, temperature: {})",
        client.name(),
        client.model(),
        params.temperature
    );

    Ok(client)
}
