//! Local Ollama chat provider

use super::{ClientParams, Prompt, ReasoningClient};
use crate::services::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug)]
pub struct OllamaProvider {
    api_base: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(params: &ClientParams) -> Result<Self, reqwest::Error> {
        Ok(Self {
            api_base: params.api_base.clone(),
            model: params.model.clone(),
            temperature: params.temperature,
            timeout: params.timeout,
            client: params.http_client()?,
        })
    }
}

#[async_trait]
impl ReasoningClient for OllamaProvider {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ServiceError> {
        let url = format!("{}/api/chat", self.api_base);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            stream: false,
            format: prompt.expect_json.then_some("json"),
            options: Options {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::from_transport("ollama", &e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status("ollama", status, &body, self.timeout));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(format!("ollama response: {}", e)))?;

        let content = body.message.map(|m| m.content).unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ServiceError::Malformed(
                "no content in ollama response".to_string(),
            ));
        }
        Ok(content)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: Options,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}
