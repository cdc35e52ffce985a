//! The Session/Round/Request/Response data model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One conversational session within a workspace.
///
/// A session is an ordered sequence of [`Round`]s. Each round pairs one
/// user [`Request`] with one assistant [`Response`]; the response's actual
/// streamed content lives in the [`crate::turn::Turn`] records kept
/// alongside this session, not inline here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub workspace_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub rounds: Vec<Round>,
}

impl Session {
    pub fn new(id: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            workspace_id: workspace_id.into(),
            title: String::new(),
            description: String::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            rounds: Vec::new(),
        }
    }

    /// The index the next round must use to keep `Round.index` dense,
    /// zero-based, and strictly increasing.
    pub fn next_round_index(&self) -> u32 {
        self.rounds.len() as u32
    }
}

/// One request/response pair within a session, identified by a monotonic
/// `index` that is dense and zero-based within its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub index: u32,
    pub request: Request,
    pub response: Response,
}

/// The user-supplied input that opened a [`Round`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The assistant-side container for a [`Round`]. Its actual content lives
/// in the Turn records carrying this `id` as their `response_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub created_at: DateTime<Utc>,
}
