// Stream reassembly: raw SSE bytes -> frames -> folded notifications

use futures::{Stream, StreamExt};
use serde_json::Value;

use super::chunk::StreamChunk;
use super::decoder::Utf8Decoder;
use super::line_buffer::LineBuffer;
use super::transcript::AggregateTranscript;
use super::{NotificationStream, StreamNotification};
use crate::error::{OpenRouterError, Result};
use crate::response::parse_envelope;
use crate::types::Message;

/// Comment line OpenRouter sends while a request is queued or warming up
pub const KEEP_ALIVE: &str = ": OPENROUTER PROCESSING";

/// Any line containing this ends the stream
pub const DONE_MARKER: &str = "[DONE]";

/// A complete unit recovered from the byte stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(Value),
    Done,
}

enum LineOutcome {
    KeepAlive(usize),
    Done,
    Event(Value, usize),
    Malformed(usize, serde_json::Error),
    Incomplete,
}

/// Incremental SSE framer: feed it bytes as they arrive, get back complete frames
///
/// A line that fails to parse is kept while it is still the unterminated tail
/// of the buffer (the rest of the JSON is assumed to be in flight). Once a
/// newline follows it, the line is complete and malformed, and is dropped.
#[derive(Debug)]
pub struct SseFramer {
    decoder: Utf8Decoder,
    buffer: LineBuffer,
    done: bool,
}

impl Default for SseFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl SseFramer {
    pub fn new() -> Self {
        Self {
            decoder: Utf8Decoder::new(),
            buffer: LineBuffer::with_capacity(4096),
            done: false,
        }
    }

    /// Feed newly received bytes
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        if self.done {
            return Vec::new();
        }
        let text = self.decoder.decode(bytes);
        self.buffer.push_str(&text);
        self.drain()
    }

    /// The byte source is exhausted: flush the decoder and make a last pass
    pub fn finish(&mut self) -> Vec<Frame> {
        if self.done {
            return Vec::new();
        }
        let text = self.decoder.finish();
        self.buffer.push_str(&text);
        self.drain()
    }

    /// True once the terminal marker has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Text received but not yet consumed as a frame
    pub fn pending(&self) -> &str {
        self.buffer.as_str()
    }

    fn drain(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();

        loop {
            let outcome = match self.buffer.next_line() {
                Some(line) => classify(line.text, line.terminated, line.len),
                None => break,
            };

            match outcome {
                LineOutcome::KeepAlive(len) => self.buffer.consume(len),
                LineOutcome::Done => {
                    tracing::debug!("Received [DONE] marker");
                    self.done = true;
                    frames.push(Frame::Done);
                    break;
                }
                LineOutcome::Event(value, len) => {
                    self.buffer.consume(len);
                    frames.push(Frame::Event(value));
                }
                LineOutcome::Malformed(len, e) => {
                    tracing::warn!("Skipping malformed SSE line: {}", e);
                    self.buffer.consume(len);
                }
                LineOutcome::Incomplete => break,
            }
        }

        frames
    }
}

fn classify(text: &str, terminated: bool, len: usize) -> LineOutcome {
    if text == KEEP_ALIVE {
        return LineOutcome::KeepAlive(len);
    }
    if text.contains(DONE_MARKER) {
        return LineOutcome::Done;
    }

    match parse_data_line(text) {
        Ok(value) => LineOutcome::Event(value, len),
        Err(e) if terminated => LineOutcome::Malformed(len, e),
        Err(_) => LineOutcome::Incomplete,
    }
}

/// Parse the JSON after the `data:` marker
pub fn parse_data_line(line: &str) -> serde_json::Result<Value> {
    let payload = line
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(line);
    serde_json::from_str(payload)
}

/// Strategy for turning each parsed event into the value handed to the caller
pub trait EventFold: Send {
    type Output: Send + 'static;

    fn fold(&mut self, event: Value) -> Result<Self::Output>;
}

/// Chunk mode: every event is passed on as received
#[derive(Debug, Default, Clone, Copy)]
pub struct ChunkFold;

impl EventFold for ChunkFold {
    type Output = StreamChunk;

    fn fold(&mut self, event: Value) -> Result<StreamChunk> {
        Ok(serde_json::from_value(event)?)
    }
}

/// Whole mode: events are folded into a running transcript, emitted after each one
#[derive(Debug, Clone)]
pub struct TranscriptFold {
    transcript: AggregateTranscript,
}

impl TranscriptFold {
    pub fn new(history: Vec<Message>) -> Self {
        Self {
            transcript: AggregateTranscript::new(history),
        }
    }
}

impl EventFold for TranscriptFold {
    type Output = AggregateTranscript;

    fn fold(&mut self, event: Value) -> Result<AggregateTranscript> {
        let chunk: StreamChunk = serde_json::from_value(event)?;
        self.transcript.apply(&chunk);
        tracing::trace!(
            content_len = self.transcript.reply.content.len(),
            "Folded stream event"
        );
        Ok(self.transcript.clone())
    }
}

/// Turn one frame into a notification; the flag says whether the stream ends here
fn apply_frame<F: EventFold>(fold: &mut F, frame: Frame) -> (StreamNotification<F::Output>, bool) {
    match frame {
        Frame::Done => (StreamNotification::End, true),
        // A mid-stream `{"error": {...}}` payload ends the stream
        Frame::Event(value) => match parse_envelope::<Value>(value).and_then(|v| fold.fold(v)) {
            Ok(output) => (StreamNotification::Data(output), false),
            Err(e) => (StreamNotification::Error(e), true),
        },
    }
}

/// Run the reassembly loop over a byte stream
///
/// Ends with exactly one `End` or `Error` notification. A source that closes
/// before `[DONE]` yields `Error(StreamClosed)` carrying the unconsumed tail.
pub fn reassemble<S, B, E, F>(bytes: S, fold: F) -> NotificationStream<F::Output>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<OpenRouterError> + Send,
    F: EventFold + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut fold = fold;
        let mut framer = SseFramer::new();

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    for frame in framer.feed(bytes.as_ref()) {
                        let (notification, terminal) = apply_frame(&mut fold, frame);
                        yield notification;
                        if terminal {
                            return;
                        }
                    }
                }
                Err(e) => {
                    yield StreamNotification::Error(e.into());
                    return;
                }
            }
        }

        for frame in framer.finish() {
            let (notification, terminal) = apply_frame(&mut fold, frame);
            yield notification;
            if terminal {
                return;
            }
        }

        let pending = framer.pending().to_string();
        tracing::warn!(pending_bytes = pending.len(), "Stream closed before [DONE] marker");
        yield StreamNotification::Error(OpenRouterError::StreamClosed { pending });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_framer_splits_events() {
        let mut framer = SseFramer::new();
        let frames = framer.feed(b"data: {\"a\":1}\n\ndata: {\"a\":2}\n");

        assert_eq!(frames, vec![Frame::Event(json!({"a": 1})), Frame::Event(json!({"a": 2}))]);
        assert!(framer.pending().is_empty());
    }

    #[test]
    fn test_framer_keeps_truncated_json() {
        let mut framer = SseFramer::new();

        assert!(framer.feed(b"data: {\"a\":").is_empty());
        assert_eq!(framer.pending(), "data: {\"a\":");

        let frames = framer.feed(b"1}\n");
        assert_eq!(frames, vec![Frame::Event(json!({"a": 1}))]);
    }

    #[test]
    fn test_framer_drops_terminated_malformed_line() {
        let mut framer = SseFramer::new();
        let frames = framer.feed(b"data: {oops\ndata: {\"a\":1}\n");

        assert_eq!(frames, vec![Frame::Event(json!({"a": 1}))]);
    }

    #[test]
    fn test_framer_keep_alive_and_done() {
        let mut framer = SseFramer::new();
        let frames = framer.feed(b": OPENROUTER PROCESSING\ndata: [DONE]\ndata: {\"a\":1}\n");

        assert_eq!(frames, vec![Frame::Done]);
        assert!(framer.is_done());
        assert!(framer.feed(b"data: {\"b\":2}\n").is_empty());
    }

    #[test]
    fn test_framer_accepts_data_without_space() {
        let mut framer = SseFramer::new();
        let frames = framer.feed(b"data:{\"a\":1}\n");

        assert_eq!(frames, vec![Frame::Event(json!({"a": 1}))]);
    }

    #[test]
    fn test_framer_unterminated_complete_event() {
        let mut framer = SseFramer::new();
        let frames = framer.feed(b"data: {\"a\":1}");

        assert_eq!(frames, vec![Frame::Event(json!({"a": 1}))]);
        assert!(framer.pending().is_empty());
    }
}
