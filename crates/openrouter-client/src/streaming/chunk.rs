use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::response::Usage;

/// One decoded `data:` payload of a streaming completion
///
/// Either a delta event (`choices[0].delta`) or the terminal usage event,
/// which carries `usage` and a null `finish_reason`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<StreamChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Any other top-level fields, kept as received
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// e.g. `native_finish_reason`, `logprobs`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Partial tool calls, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An explicit `null` decodes like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl StreamChunk {
    fn first_choice(&self) -> Option<&StreamChoice> {
        self.choices.first()
    }

    pub fn delta(&self) -> Option<&Delta> {
        self.first_choice().map(|c| &c.delta)
    }

    pub fn content(&self) -> Option<&str> {
        self.delta().and_then(|d| d.content.as_deref())
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.delta().and_then(|d| d.reasoning.as_deref())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.first_choice().and_then(|c| c.finish_reason.as_deref())
    }

    /// True for the trailing usage-only event
    pub fn is_usage(&self) -> bool {
        self.usage.is_some()
    }
}
