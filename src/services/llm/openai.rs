//! OpenAI chat completions provider
//!
//! Mistral serves the same wire format, so one implementation covers both.

use super::{ClientParams, Prompt, ReasoningClient};
use crate::config::ProviderKind;
use crate::services::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat completions client for OpenAI and OpenAI-compatible APIs
pub struct OpenAiCompatibleProvider {
    kind: ProviderKind,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("kind", &self.kind)
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiCompatibleProvider {
    pub fn new(
        kind: ProviderKind,
        api_key: String,
        params: &ClientParams,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            kind,
            api_key,
            api_base: params.api_base.clone(),
            model: params.model.clone(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            timeout: params.timeout,
            client: params.http_client()?,
        })
    }

    fn build_request(&self, prompt: &Prompt) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            response_format: prompt.expect_json.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ReasoningClient for OpenAiCompatibleProvider {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.api_base);
        let service = self.kind.as_str();

        tracing::debug!("Sending request to {} ({})", service, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| ServiceError::from_transport(service, &e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(service, status, &body, self.timeout));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("{} response: {}", service, e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ServiceError::Malformed(format!("no content in {} response", service)))
    }

    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
