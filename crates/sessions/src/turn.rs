//! The Turn data model: one model streaming pass within a Response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A Turn's lifecycle state.
///
/// `Streaming` is the only non-terminal state; once a Turn reaches
/// `Completed` or `Error` it is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Streaming,
    Completed,
    Error,
}

/// A structured tool invocation emitted by the model mid-turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub server_name: String,
    pub method_name: String,
    pub arguments: Value,
}

/// `toolCalls` on a Turn: a tagged record, not a list — a Turn carries at
/// most one call, and `response` is filled in once the tool server replies
/// (or fails).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolCallRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

/// One model streaming pass, child of a [`crate::session::Response`],
/// ordered by `index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub response_id: String,
    pub index: u32,
    #[serde(default)]
    pub raw_response: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: ToolCallRecord,
    pub status: TurnStatus,
    pub stream_start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Turn {
    pub fn new(response_id: impl Into<String>, index: u32) -> Self {
        Self {
            response_id: response_id.into(),
            index,
            raw_response: String::new(),
            content: String::new(),
            tool_calls: ToolCallRecord::default(),
            status: TurnStatus::Streaming,
            stream_start_time: Utc::now(),
            stream_end_time: None,
            current_tokens: 0,
            expected_tokens: None,
            cost_usd: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TurnStatus::Completed | TurnStatus::Error)
    }

    pub fn complete(&mut self) {
        self.status = TurnStatus::Completed;
        self.stream_end_time = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = TurnStatus::Error;
        self.stream_end_time = Some(Utc::now());
        self.error = Some(message.into());
    }
}

/// `{ responseId, isComplete }` — derived, never stored: true iff every
/// Turn attached to the response is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingStatus {
    pub response_id: String,
    pub is_complete: bool,
}

impl StreamingStatus {
    pub fn of<'a>(response_id: &str, turns: impl IntoIterator<Item = &'a Turn>) -> Self {
        let is_complete = turns
            .into_iter()
            .filter(|t| t.response_id == response_id)
            .all(|t| t.is_terminal());
        Self {
            response_id: response_id.to_owned(),
            is_complete,
        }
    }
}
