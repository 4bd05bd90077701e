use serde_json::Value;
use thiserror::Error;

use crate::response::ApiStatus;

#[derive(Error, Debug)]
pub enum OpenRouterError {
    #[error("Request cancelled")]
    Cancelled,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OpenRouter API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        metadata: Option<Value>,
    },

    #[error("HTTP error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Stream closed before the [DONE] marker ({} bytes pending)", pending.len())]
    StreamClosed { pending: String },
}

impl OpenRouterError {
    /// HTTP or upstream status code, when the failure carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Named upstream status, for the documented codes
    pub fn api_status(&self) -> Option<ApiStatus> {
        self.status().and_then(ApiStatus::from_code)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, OpenRouterError>;
