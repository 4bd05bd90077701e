// Non-streaming response shapes returned by OpenRouter

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OpenRouterError, Result};
use crate::types::ToolCall;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub choices: Vec<Choice>,
    /// Unix timestamp
    pub created: i64,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Only present if the provider supports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Text of the first choice
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }

    /// Reasoning text of the first choice
    pub fn reasoning(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.reasoning.as_deref())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.finish_reason.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// 'stop' | 'length' | 'content_filter' | 'tool_calls' | ... depending on the model
    pub finish_reason: Option<String>,
    pub message: ResponseMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ChoiceError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
    pub role: String,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Including images and tools if any
    pub prompt_tokens: u32,
    /// The tokens generated
    pub completion_tokens: u32,
    /// Sum of the above two fields
    pub total_tokens: u32,
    /// Provider extras such as `cost` or token detail breakdowns
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `error` object OpenRouter returns instead of a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(alias = "code")]
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

impl From<ApiErrorBody> for OpenRouterError {
    fn from(body: ApiErrorBody) -> Self {
        OpenRouterError::Api {
            status: body.status,
            message: body.message,
            metadata: body.metadata,
        }
    }
}

/// Documented upstream status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    BadRequest,
    InvalidCredentials,
    InsufficientCredits,
    Timeout,
    RateLimited,
    ModelUnavailable,
    NoAvailableProvider,
}

impl ApiStatus {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            400 => Some(Self::BadRequest),
            401 => Some(Self::InvalidCredentials),
            402 => Some(Self::InsufficientCredits),
            408 => Some(Self::Timeout),
            429 => Some(Self::RateLimited),
            502 => Some(Self::ModelUnavailable),
            503 => Some(Self::NoAvailableProvider),
            _ => None,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::InvalidCredentials => 401,
            Self::InsufficientCredits => 402,
            Self::Timeout => 408,
            Self::RateLimited => 429,
            Self::ModelUnavailable => 502,
            Self::NoAvailableProvider => 503,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request (invalid or missing params, CORS)",
            Self::InvalidCredentials => {
                "Invalid credentials (OAuth session expired, disabled/invalid API key)"
            }
            Self::InsufficientCredits => {
                "Your account or API key has insufficient credits. Add more credits and retry the request."
            }
            Self::Timeout => "Your request timed out",
            Self::RateLimited => "You are being rate limited",
            Self::ModelUnavailable => {
                "Your chosen model is down or we received an invalid response from it"
            }
            Self::NoAvailableProvider => {
                "There is no available model provider that meets your routing requirements"
            }
        }
    }
}

/// Token and cost statistics for a finished generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub data: GenerationData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationData {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub streamed: bool,
    #[serde(default)]
    pub generation_time: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tokens_prompt: Option<u32>,
    #[serde(default)]
    pub tokens_completion: Option<u32>,
    #[serde(default)]
    pub native_tokens_prompt: Option<u32>,
    #[serde(default)]
    pub native_tokens_completion: Option<u32>,
    #[serde(default)]
    pub num_media_prompt: Option<u32>,
    #[serde(default)]
    pub num_media_completion: Option<u32>,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub cache_discount: Option<f64>,
}

/// Classify a parsed body: an `error` envelope becomes `OpenRouterError::Api`,
/// anything else must decode as `T`
pub fn parse_envelope<T: DeserializeOwned>(value: Value) -> Result<T> {
    if value.get("error").is_some() {
        let envelope: ErrorEnvelope = serde_json::from_value(value)?;
        return Err(envelope.error.into());
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_success() {
        let value = json!({
            "id": "gen-1",
            "created": 1700000000,
            "model": "openai/gpt-4o",
            "choices": [{
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": "Paris", "reasoning": null}
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
        });

        let response: ChatResponse = parse_envelope(value).unwrap();
        assert_eq!(response.content(), Some("Paris"));
        assert_eq!(response.finish_reason(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 11);
    }

    #[test]
    fn test_parse_error_envelope() {
        let value = json!({
            "error": {"status": 402, "message": "No credits", "metadata": {"k": "v"}}
        });

        let err = parse_envelope::<ChatResponse>(value).unwrap_err();
        match err {
            OpenRouterError::Api { status, message, metadata } => {
                assert_eq!(status, 402);
                assert_eq!(message, "No credits");
                assert_eq!(metadata, Some(json!({"k": "v"})));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_envelope_accepts_code_field() {
        let value = json!({"error": {"code": 429, "message": "Slow down"}});

        let err = parse_envelope::<ChatResponse>(value).unwrap_err();
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn test_api_status_catalogue() {
        assert_eq!(ApiStatus::from_code(429), Some(ApiStatus::RateLimited));
        assert_eq!(ApiStatus::RateLimited.code(), 429);
        assert_eq!(ApiStatus::from_code(418), None);
        assert!(ApiStatus::NoAvailableProvider.description().contains("routing"));
    }
}
