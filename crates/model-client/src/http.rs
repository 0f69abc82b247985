use std::time::Instant;

use async_trait::async_trait;

use crate::types::{ChatCompletionRequest, ChatCompletionResponse, ResponseFormat};
use crate::{ModelClientError, ModelProvider, ModelRequest, ModelResponse, Result, TokenUsage};

/// Longest error body kept on a `Status` error.
const MAX_ERROR_BODY: usize = 500;

/// Provider speaking the OpenAI-compatible `/chat/completions` protocol.
///
/// Most hosted and self-hosted model gateways accept this shape, so one
/// implementation covers them all; only `base_url`, `model` and the key
/// differ between configured providers.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Build a provider whose key is read from the environment variable `var`.
    pub fn from_env(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        var: &str,
    ) -> Result<Self> {
        let key = std::env::var(var).map_err(|_| ModelClientError::MissingApiKey(var.into()))?;
        Ok(Self::new(name, base_url, model, Some(key)))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ModelProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(provider = %self.name, model = %self.model, "invoking model");

        let response = builder.send().await.map_err(|source| ModelClientError::Http {
            provider: self.name.clone(),
            source,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| ModelClientError::Http {
            provider: self.name.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(ModelClientError::Status {
                provider: self.name.clone(),
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|source| ModelClientError::Parse {
                provider: self.name.clone(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
                source,
            })?;

        let content = parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ModelClientError::EmptyResponse(self.name.clone()))?;

        let latency_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(provider = %self.name, latency_ms, "model replied");

        Ok(ModelResponse {
            provider: self.name.clone(),
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            content,
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            latency_ms,
        })
    }
}
