//! Anthropic messages API provider

use super::{ClientParams, Prompt, ReasoningClient};
use crate::services::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(api_key: String, params: &ClientParams) -> Result<Self, reqwest::Error> {
        Ok(Self {
            api_key,
            api_base: params.api_base.clone(),
            model: params.model.clone(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            timeout: params.timeout,
            client: params.http_client()?,
        })
    }
}

#[async_trait]
impl ReasoningClient for AnthropicProvider {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ServiceError> {
        let url = format!("{}/v1/messages", self.api_base);

        // No native JSON mode; the instruction goes into the system prompt
        let system = if prompt.expect_json {
            format!("{}\n\nRespond ONLY with valid JSON, no explanation.", prompt.system)
        } else {
            prompt.system.clone()
        };

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system,
            messages: vec![Message {
                role: "user",
                content: &prompt.user,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::from_transport("anthropic", &e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // 529 is Anthropic's "overloaded"; from_status treats all 5xx as transient
            return Err(ServiceError::from_status("anthropic", status, &body, self.timeout));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("anthropic response: {}", e)))?;

        let text: String = body
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(ServiceError::Malformed(
                "no text in anthropic response".to_string(),
            ));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}
