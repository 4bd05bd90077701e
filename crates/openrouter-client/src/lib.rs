pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod streaming;
pub mod types;

pub use client::{ChatClient, OpenRouterClient, OpenRouterClientBuilder};
pub use config::{
    Config, DataCollection, ModelSelection, Prediction, ProviderPreferences, Quantization,
    ReasoningConfig, ReasoningEffort, ResponseFormat, StopSequences, Transform,
};
pub use error::{OpenRouterError, Result};
pub use request::{ChatRequest, RequestDescriptor, OPENROUTER_API_BASE};
pub use response::{ApiStatus, ChatResponse, GenerationStats, Usage};
pub use streaming::{
    AggregateTranscript, NotificationStream, ReplyMessage, StreamChunk, StreamNotification,
};
pub use types::{Content, ContentPart, Message, Role, Tool, ToolCall, ToolChoice};

pub use tokio_util::sync::CancellationToken;
