// OpenRouter client: one-shot completion, generation stats and the two streaming modes

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{OpenRouterError, Result};
use crate::request::{
    build_chat_request, build_generation_request, resolve_config, ChatRequest, OPENROUTER_API_BASE,
};
use crate::response::{parse_envelope, ChatResponse, GenerationStats};
use crate::streaming::{
    reassemble, AggregateTranscript, ChunkFold, EventFold, NotificationStream, StreamChunk,
    StreamNotification, TranscriptFold,
};

/// Chat-completion operations offered by OpenRouter
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Non-streaming completion
    ///
    /// The request is abandoned (and `OpenRouterError::Cancelled` returned) as
    /// soon as `cancel` fires. At most one HTTP request is issued; no retries.
    async fn complete(
        &self,
        request: ChatRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ChatResponse>;

    /// Token and cost statistics for a finished generation
    async fn generation_stats(&self, generation_id: &str) -> Result<GenerationStats>;

    /// Streaming completion, one notification per upstream event
    fn stream_chunks(&self, request: ChatRequest) -> NotificationStream<StreamChunk>;

    /// Streaming completion, one updated transcript per upstream event
    fn stream_transcript(&self, request: ChatRequest) -> NotificationStream<AggregateTranscript>;
}

/// OpenRouter client (HTTP direct, no SDK)
///
/// Cheap to clone; the default config is shared read-only between calls.
#[derive(Clone)]
pub struct OpenRouterClient {
    http_client: reqwest::Client,
    api_key: Arc<str>,
    base_url: Arc<str>,
    default_config: Arc<Config>,
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("default_config", &self.default_config)
            .finish()
    }
}

impl OpenRouterClient {
    /// Create new client with API key and no default config
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    pub fn builder() -> OpenRouterClientBuilder {
        OpenRouterClientBuilder::default()
    }

    /// Build from `OPENROUTER_API_KEY` (required) and `OPENROUTER_BASE_URL` (optional)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY").map_err(|_| {
            OpenRouterError::InvalidConfig(
                "OPENROUTER_API_KEY environment variable is required".to_string(),
            )
        })?;

        let mut builder = Self::builder().api_key(api_key);
        if let Ok(base_url) = std::env::var("OPENROUTER_BASE_URL") {
            builder = builder.base_url(base_url);
        }
        builder.build()
    }

    pub fn default_config(&self) -> &Config {
        &self.default_config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send the request lazily, on first poll, and reassemble the body with `fold`
    fn open_stream<F: EventFold + 'static>(
        &self,
        request: ChatRequest,
        fold: F,
    ) -> NotificationStream<F::Output> {
        let http_client = self.http_client.clone();
        let config = resolve_config(&self.default_config, request.config.as_ref());
        let message_count = request.messages.len();
        let prepared = build_chat_request(
            &self.base_url,
            &self.api_key,
            &request.messages,
            &config,
            true,
        );

        Box::pin(async_stream::stream! {
            let descriptor = match prepared {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    yield StreamNotification::Error(e);
                    return;
                }
            };

            tracing::debug!(url = %descriptor.url, messages = message_count, stream = true, "Sending chat completion");

            let response = match descriptor.into_request(&http_client).send().await {
                Ok(response) => response,
                Err(e) => {
                    yield StreamNotification::Error(e.into());
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() || response.content_length() == Some(0) {
                let error = match response.text().await {
                    Ok(body) => OpenRouterError::Http {
                        status: status.as_u16(),
                        body,
                    },
                    Err(e) => e.into(),
                };
                yield StreamNotification::Error(error);
                return;
            }

            let mut notifications = reassemble(response.bytes_stream(), fold);
            while let Some(notification) = notifications.next().await {
                yield notification;
            }
        })
    }
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn complete(
        &self,
        request: ChatRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<ChatResponse> {
        let config = resolve_config(&self.default_config, request.config.as_ref());
        let descriptor = build_chat_request(
            &self.base_url,
            &self.api_key,
            &request.messages,
            &config,
            false,
        )?;

        tracing::debug!(
            url = %descriptor.url,
            messages = request.messages.len(),
            stream = false,
            "Sending chat completion"
        );

        let exchange = async {
            let response = descriptor.into_request(&self.http_client).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, OpenRouterError>((status, body))
        };

        let (status, body) = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!("Chat completion cancelled");
                    return Err(OpenRouterError::Cancelled);
                }
                result = exchange => result?,
            },
            None => exchange.await?,
        };

        classify_body(status, &body)
    }

    async fn generation_stats(&self, generation_id: &str) -> Result<GenerationStats> {
        let descriptor = build_generation_request(&self.base_url, &self.api_key, generation_id)?;

        tracing::debug!(url = %descriptor.url, "Fetching generation stats");

        let response = descriptor.into_request(&self.http_client).send().await?;
        let status = response.status();
        let body = response.text().await?;

        classify_body(status, &body)
    }

    fn stream_chunks(&self, request: ChatRequest) -> NotificationStream<StreamChunk> {
        self.open_stream(request, ChunkFold)
    }

    fn stream_transcript(&self, request: ChatRequest) -> NotificationStream<AggregateTranscript> {
        let fold = TranscriptFold::new(request.messages.clone());
        self.open_stream(request, fold)
    }
}

/// Success bodies decode as `T`; `error` envelopes become `Api` errors whatever the status;
/// other non-2xx bodies become `Http` errors.
fn classify_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let parsed = serde_json::from_str::<Value>(body);

    if !status.is_success() {
        return match parsed {
            Ok(value) if value.get("error").is_some() => parse_envelope(value),
            _ => Err(OpenRouterError::Http {
                status: status.as_u16(),
                body: body.to_string(),
            }),
        };
    }

    parse_envelope(parsed?)
}

/// Builder for OpenRouterClient
#[derive(Default)]
pub struct OpenRouterClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    default_config: Option<Config>,
    http_client: Option<reqwest::Client>,
}

impl OpenRouterClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base URL
    /// Example: "https://openrouter.ai/api/v1"
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Configuration used by calls that don't bring their own (and merged under those that do)
    pub fn default_config(mut self, config: Config) -> Self {
        self.default_config = Some(config);
        self
    }

    /// Use a preconfigured reqwest client (timeouts, proxies, ...)
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn build(self) -> Result<OpenRouterClient> {
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| OpenRouterError::InvalidConfig("API key is required".to_string()))?;

        let default_config = self.default_config.unwrap_or_default();
        default_config.validate()?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| OPENROUTER_API_BASE.to_string());

        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };

        Ok(OpenRouterClient {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').into(),
            default_config: Arc::new(default_config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_requires_api_key() {
        let err = OpenRouterClient::builder().build().unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_builder_defaults() {
        let client = OpenRouterClient::new("sk-test").unwrap();

        assert_eq!(client.base_url(), OPENROUTER_API_BASE);
        assert_eq!(client.default_config(), &Config::default());
    }

    #[test]
    fn test_builder_trims_base_url() {
        let client = OpenRouterClient::builder()
            .api_key("sk-test")
            .base_url("http://localhost:9000/api/v1/")
            .build()
            .unwrap();

        assert_eq!(client.base_url(), "http://localhost:9000/api/v1");
    }

    #[test]
    fn test_classify_non_json_error_status() {
        let err = classify_body::<ChatResponse>(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();

        match err {
            OpenRouterError::Http { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("Expected Http error, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_error_envelope_on_error_status() {
        let body = json!({"error": {"status": 401, "message": "No auth"}}).to_string();
        let err = classify_body::<ChatResponse>(StatusCode::UNAUTHORIZED, &body).unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(matches!(err, OpenRouterError::Api { .. }));
    }
}
