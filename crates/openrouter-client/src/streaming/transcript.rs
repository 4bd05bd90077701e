use serde::{Deserialize, Serialize};

use super::chunk::StreamChunk;
use crate::response::Usage;
use crate::types::Message;

/// The assistant reply being reconstructed from deltas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    /// Empty until the first delta carrying a role
    pub role: String,
    pub content: String,
    /// None until a delta carries non-empty reasoning text
    pub reasoning: Option<String>,
}

/// Running aggregate of a streamed completion
///
/// `history` is the caller's conversation and is never touched; only `reply`
/// changes as events are folded in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateTranscript {
    pub id: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub object: Option<String>,
    pub created: Option<i64>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
    pub history: Vec<Message>,
    pub reply: ReplyMessage,
}

/// A message of the transcript in conversation order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TranscriptMessage<'a> {
    History(&'a Message),
    Reply(&'a ReplyMessage),
}

impl AggregateTranscript {
    pub fn new(history: Vec<Message>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    /// Fold one event into the aggregate
    ///
    /// A delta without `role` leaves the reply's role as it was.
    pub fn apply(&mut self, chunk: &StreamChunk) {
        if let Some(usage) = &chunk.usage {
            // The real finish_reason arrived on the previous delta; the usage event's is always null.
            self.usage = Some(usage.clone());
        } else {
            overwrite(&mut self.id, &chunk.id);
            overwrite(&mut self.provider, &chunk.provider);
            overwrite(&mut self.model, &chunk.model);
            overwrite(&mut self.object, &chunk.object);
            if chunk.created.is_some() {
                self.created = chunk.created;
            }
            self.finish_reason = chunk.finish_reason().map(str::to_string);
        }

        let Some(delta) = chunk.delta() else {
            return;
        };

        if let Some(role) = &delta.role {
            self.reply.role.clone_from(role);
        }
        if let Some(content) = &delta.content {
            self.reply.content.push_str(content);
        }
        if let Some(reasoning) = delta.reasoning.as_deref().filter(|r| !r.is_empty()) {
            self.reply
                .reasoning
                .get_or_insert_with(String::new)
                .push_str(reasoning);
        }
    }

    /// History followed by the reply
    pub fn messages(&self) -> Vec<TranscriptMessage<'_>> {
        self.history
            .iter()
            .map(TranscriptMessage::History)
            .chain(std::iter::once(TranscriptMessage::Reply(&self.reply)))
            .collect()
    }

    pub fn content(&self) -> &str {
        &self.reply.content
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.reply.reasoning.as_deref()
    }
}

fn overwrite(slot: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}
