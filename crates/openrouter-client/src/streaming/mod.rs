mod chunk;
mod decoder;
mod engine;
mod line_buffer;
mod transcript;

use std::pin::Pin;

use futures::Stream;

use crate::error::OpenRouterError;

pub use chunk::{Delta, StreamChoice, StreamChunk};
pub use decoder::Utf8Decoder;
pub use engine::{
    parse_data_line, reassemble, ChunkFold, EventFold, Frame, SseFramer, TranscriptFold,
    DONE_MARKER, KEEP_ALIVE,
};
pub use line_buffer::{Line, LineBuffer};
pub use transcript::{AggregateTranscript, ReplyMessage, TranscriptMessage};

/// What a streaming call hands to the caller
#[derive(Debug)]
pub enum StreamNotification<T> {
    /// A raw event (chunk mode) or the updated transcript (whole mode)
    Data(T),
    /// The stream completed normally
    End,
    /// The stream failed; nothing follows
    Error(OpenRouterError),
}

impl<T> StreamNotification<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Error(_))
    }

    pub fn data(self) -> Option<T> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }
}

pub type NotificationStream<T> = Pin<Box<dyn Stream<Item = StreamNotification<T>> + Send>>;
