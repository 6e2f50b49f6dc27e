//! OpenAI-compatible client for chat completions and image generation

use super::decode_response;
use crate::config::OpenAiConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::{Metrics, Outcome, Service};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

const SERVICE: &str = "openai";

/// Per-call sampling parameters
///
/// Unset fields fall back to the values in [`OpenAiConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingOverrides {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    quality: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    style: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    url: Option<String>,
}

/// Client for an OpenAI-compatible API
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
    api_key: Option<String>,
    metrics: Arc<Metrics>,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig, api_key: Option<String>, metrics: Arc<Metrics>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_key,
            metrics,
        }
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.post(self.endpoint(path));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Send a single-message chat completion and return the assistant text
    pub async fn chat_completion(
        &self,
        prompt: &str,
        overrides: SamplingOverrides,
    ) -> AppResult<String> {
        let request = ChatCompletionRequest {
            model: &self.config.chat_model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: overrides.temperature.unwrap_or(self.config.temperature),
            max_tokens: overrides.max_tokens.unwrap_or(self.config.max_tokens),
        };

        tracing::debug!(
            model = %request.model,
            prompt_length = prompt.len(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "Sending chat completion"
        );

        let start = Instant::now();
        let result = self.send_chat(&request).await;
        self.record(Service::Chat, &result, start);
        result
    }

    async fn send_chat(&self, request: &ChatCompletionRequest<'_>) -> AppResult<String> {
        let response = self
            .post("chat/completions")
            .json(request)
            .send()
            .await
            .map_err(|source| AppError::UpstreamTransport {
                service: SERVICE,
                source,
            })?;

        let body: ChatCompletionResponse = decode_response(SERVICE, response).await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AppError::EmptyResult { service: SERVICE })
    }

    /// Generate one image and return its URL
    pub async fn generate_image(&self, prompt: &str) -> AppResult<String> {
        let request = ImageGenerationRequest {
            model: &self.config.image_model,
            prompt,
            n: 1,
            size: &self.config.image_size,
            quality: &self.config.image_quality,
            style: &self.config.image_style,
        };

        tracing::debug!(
            model = %request.model,
            size = %request.size,
            prompt_length = prompt.len(),
            "Sending image generation"
        );

        let start = Instant::now();
        let result = self.send_image(&request).await;
        self.record(Service::Dalle, &result, start);
        result
    }

    async fn send_image(&self, request: &ImageGenerationRequest<'_>) -> AppResult<String> {
        let response = self
            .post("images/generations")
            .json(request)
            .send()
            .await
            .map_err(|source| AppError::UpstreamTransport {
                service: SERVICE,
                source,
            })?;

        let body: ImagesResponse = decode_response(SERVICE, response).await?;
        body.data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .ok_or(AppError::EmptyResult { service: SERVICE })
    }

    fn record<T>(&self, service: Service, result: &AppResult<T>, start: Instant) {
        let outcome = match result {
            Ok(_) => Outcome::Success,
            Err(e) => {
                tracing::warn!(service = service.as_str(), error = %e, "Upstream call failed");
                Outcome::Failure
            }
        };
        self.metrics.record_upstream(service, outcome, start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let request = ChatCompletionRequest {
            model: "gpt-3.5-turbo",
            messages: [ChatMessage {
                role: "user",
                content: "hello",
            }],
            temperature: 0.7,
            max_tokens: 150,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
        assert_eq!(json["temperature"], 0.7);
        assert_eq!(json["max_tokens"], 150);
    }

    #[test]
    fn test_image_request_omits_empty_quality_and_style() {
        let request = ImageGenerationRequest {
            model: "dall-e-2",
            prompt: "a bowl of ramen",
            n: 1,
            size: "512x512",
            quality: "",
            style: "",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("quality").is_none());
        assert!(json.get("style").is_none());
        assert_eq!(json["n"], 1);
    }

    #[test]
    fn test_chat_response_tolerates_extra_fields() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Risotto"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Risotto"));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = OpenAiConfig {
            base_url: "http://localhost:9999/v1/".to_string(),
            ..OpenAiConfig::default()
        };
        let client = OpenAiClient::new(config, None, Arc::new(Metrics::new().unwrap()));
        assert_eq!(
            client.endpoint("chat/completions"),
            "http://localhost:9999/v1/chat/completions"
        );
    }
}
