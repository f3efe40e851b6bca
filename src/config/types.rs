use crate::lead::LeadCategory;
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Sponsor-Scout
///
/// Every section has defaults, so an empty campaign file (or none at all)
/// yields a usable configuration once the API keys are supplied.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderSettings,
    pub search: SearchSettings,
    pub pipeline: PipelineSettings,
    pub retry: RetrySettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
    pub filter: FilterSettings,
    pub classifier: ClassifierSettings,
    pub server: ServerSettings,
    #[serde(rename = "segment")]
    pub segments: Vec<SegmentEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderSettings::default(),
            search: SearchSettings::default(),
            pipeline: PipelineSettings::default(),
            retry: RetrySettings::default(),
            output: OutputSettings::default(),
            logging: LoggingSettings::default(),
            filter: FilterSettings::default(),
            classifier: ClassifierSettings::default(),
            server: ServerSettings::default(),
            segments: default_segments(),
        }
    }
}

impl Config {
    /// Keeps only the named segments, in the order they appear in the campaign
    ///
    /// An empty `names` slice keeps every segment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the unknown segment and the
    /// available ones.
    pub fn retain_segments(&mut self, names: &[String]) -> ConfigResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        for name in names {
            if !self.segments.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
                let available: Vec<&str> = self.segments.iter().map(|s| s.name.as_str()).collect();
                return Err(ConfigError::Validation(format!(
                    "Unknown segment '{}'. Available: {}",
                    name,
                    available.join(", ")
                )));
            }
        }

        self.segments
            .retain(|s| names.iter().any(|n| n.eq_ignore_ascii_case(&s.name)));
        Ok(())
    }

    /// Returns true when the run scrapes a single page instead of searching
    pub fn is_single_url_mode(&self) -> bool {
        self.pipeline.test_url.is_some()
    }
}

/// Supported reasoning providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    MistralAi,
    Ollama,
}

impl ProviderKind {
    /// Environment variable holding the provider's API key, if it needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Google => Some("GOOGLE_API_KEY"),
            Self::MistralAi => Some("MISTRAL_API_KEY"),
            Self::Ollama => None,
        }
    }

    /// Environment variable holding the per-provider model override
    pub fn model_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_MODEL",
            Self::Anthropic => "ANTHROPIC_MODEL",
            Self::Google => "GEMINI_MODEL",
            Self::MistralAi => "MISTRAL_MODEL",
            Self::Ollama => "OLLAMA_MODEL",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-3.5-turbo",
            Self::Anthropic => "claude-3-5-haiku-20241022",
            Self::Google => "gemini-1.5-flash",
            Self::MistralAi => "mistral-large-latest",
            Self::Ollama => "llama3.2",
        }
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Google => "https://generativelanguage.googleapis.com",
            Self::MistralAi => "https://api.mistral.ai/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::MistralAi => "mistralai",
            Self::Ollama => "ollama",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "google" | "gemini" => Ok(Self::Google),
            "mistralai" | "mistral" => Ok(Self::MistralAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasoning provider configuration
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProviderSettings {
    /// Provider key (openai, anthropic, google, mistralai, ollama)
    pub name: String,

    /// Model override; the provider default is used when unset
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    pub api_key: Option<String>,

    /// Base URL override (self-hosted gateways, Ollama host, tests)
    pub api_base: Option<String>,

    /// Per-call timeout for reasoning requests (seconds)
    pub request_timeout_secs: u64,

    pub max_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            model: None,
            temperature: 0.1,
            api_key: None,
            api_base: None,
            request_timeout_secs: 120,
            max_tokens: 2048,
        }
    }
}

impl ProviderSettings {
    /// Parses the provider key
    pub fn kind(&self) -> ConfigResult<ProviderKind> {
        self.name.parse()
    }

    /// Model name with any `provider/` routing prefix removed
    pub fn resolved_model(&self) -> ConfigResult<String> {
        let kind = self.kind()?;
        let model = self
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| kind.default_model());
        Ok(plain_model_name(model).to_string())
    }

    pub fn resolved_api_base(&self) -> ConfigResult<String> {
        let kind = self.kind()?;
        Ok(self
            .api_base
            .clone()
            .unwrap_or_else(|| kind.default_api_base().to_string())
            .trim_end_matches('/')
            .to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Strips a leading `provider/` routing prefix from a model name
///
/// ```
/// use sponsor_scout::config::plain_model_name;
///
/// assert_eq!(plain_model_name("openai/gpt-3.5-turbo"), "gpt-3.5-turbo");
/// assert_eq!(plain_model_name("llama3.2"), "llama3.2");
/// ```
pub fn plain_model_name(model: &str) -> &str {
    let model = model.trim();
    match model.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => model,
    }
}

/// Web search configuration
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SearchSettings {
    pub api_key: Option<String>,

    /// Search API endpoint
    pub endpoint: String,

    /// Organic results requested per query
    pub results_per_query: u32,

    /// Maximum number of source pages scraped per run
    pub max_urls: usize,

    /// Country bias passed to the search API
    pub country: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://google.serper.dev".to_string(),
            results_per_query: 10,
            max_urls: 10,
            country: "us".to_string(),
        }
    }
}

impl fmt::Debug for SearchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("results_per_query", &self.results_per_query)
            .field("max_urls", &self.max_urls)
            .field("country", &self.country)
            .finish()
    }
}

/// Pipeline limits
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PipelineSettings {
    /// Cap on candidates processed per run
    pub max_candidates: usize,

    /// Per-request scrape timeout (seconds)
    pub scrape_timeout_secs: u64,

    /// Page text handed to the extraction prompt is truncated to this many characters
    pub max_page_chars: usize,

    /// Contact pages visited per company when the homepage has no preferred address
    pub max_contact_pages: usize,

    /// Scrape this single page instead of searching
    pub test_url: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_candidates: 50,
            scrape_timeout_secs: 20,
            max_page_chars: 12_000,
            max_contact_pages: 3,
            test_url: None,
        }
    }
}

impl PipelineSettings {
    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}

/// Retry policy for external calls
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetrySettings {
    pub max_attempts: u32,

    /// Delay before the first retry (seconds)
    pub delay_secs: f64,

    /// Multiplier applied to the delay after each retry
    pub backoff: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 2.0,
            backoff: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs.max(0.0))
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputSettings {
    /// Path of the CSV report
    pub path: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: "output.csv".to_string(),
        }
    }
}

/// HTTP trigger configuration, used by `serve`
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerSettings {
    /// Listen address
    pub bind: String,

    /// Shared key expected in the `x-api-key` header
    pub api_key: Option<String>,

    /// Finished result files kept for download; the oldest is evicted first
    pub max_cached_jobs: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            api_key: None,
            max_cached_jobs: 50,
        }
    }
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("bind", &self.bind)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_cached_jobs", &self.max_cached_jobs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoggingSettings {
    /// DEBUG, INFO, WARNING or ERROR
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
        }
    }
}

/// Source and candidate filtering
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterSettings {
    /// Domain patterns (e.g., "example.com" or "*.example.com") never scraped or analyzed
    pub exclude_domains: Vec<String>,

    /// Keep search results on foreign country-code TLDs
    pub allow_foreign_tlds: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            exclude_domains: [
                "*.wikipedia.org",
                "*.wikimedia.org",
                "*.facebook.com",
                "*.linkedin.com",
                "*.twitter.com",
                "*.x.com",
                "*.instagram.com",
                "*.youtube.com",
                "*.reddit.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allow_foreign_tlds: false,
        }
    }
}

/// Extra keywords layered on top of the built-in classifier vocabulary
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClassifierSettings {
    pub hr_keywords: Vec<String>,
    pub ne_b2b_keywords: Vec<String>,

    /// Category assigned when signals are absent or tied
    pub fallback: LeadCategory,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            hr_keywords: Vec::new(),
            ne_b2b_keywords: Vec::new(),
            fallback: LeadCategory::NeB2b,
        }
    }
}

/// A named market segment with its search queries
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SegmentEntry {
    pub name: String,

    /// Category whose analysis brief this segment's brief replaces
    pub category: LeadCategory,

    pub queries: Vec<String>,

    /// Analysis brief override for the segment's category
    #[serde(default)]
    pub brief: Option<String>,
}

fn default_segments() -> Vec<SegmentEntry> {
    vec![
        SegmentEntry {
            name: "hr-tech".to_string(),
            category: LeadCategory::Hr,
            queries: vec![
                "top HR software companies sponsoring HR conferences".to_string(),
                "HR technology vendors list payroll benefits recruiting".to_string(),
            ],
            brief: None,
        },
        SegmentEntry {
            name: "northeast-b2b".to_string(),
            category: LeadCategory::NeB2b,
            queries: vec![
                "top B2B companies headquartered in New England".to_string(),
                "Boston area B2B services companies list".to_string(),
            ],
            brief: None,
        },
    ]
}
