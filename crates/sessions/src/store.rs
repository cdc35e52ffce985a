//! Workspace-owned session store.
//!
//! Persists session state in `sessions.json` under the workspace's state
//! path. Each session is keyed by its `sessionId` and tracks its own
//! ordered `rounds` list; the actual Turn stream lives in a sibling
//! [`crate::turn_store::TurnStore`] keyed by session id, since it churns
//! far more often than the session's Round metadata.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;

use sa_domain::error::{Error, Result};

use crate::session::{Request, Response, Round, Session};

/// A workspace's session store backed by a JSON file.
pub struct SessionStore {
    path: PathBuf,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Load or create the store at `state_path/sessions/sessions.json`.
    pub fn new(state_path: &Path) -> Result<Self> {
        let dir = state_path.join("sessions");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;

        let path = dir.join("sessions.json");
        let sessions = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        tracing::info!(
            sessions = sessions.len(),
            path = %path.display(),
            "session store loaded"
        );

        Ok(Self {
            path,
            sessions: RwLock::new(sessions),
        })
    }

    /// Create a new, empty session. The caller supplies the id (typically
    /// a freshly minted UUID) so it can be used as the registry cache key
    /// before the store write completes.
    pub fn create(&self, session_id: &str, workspace_id: &str) -> Result<Session> {
        let session = Session::new(session_id, workspace_id);
        {
            let mut sessions = self.sessions.write();
            if sessions.contains_key(session_id) {
                return Err(Error::Conflict(format!(
                    "session '{session_id}' already exists"
                )));
            }
            sessions.insert(session_id.to_owned(), session.clone());
        }
        self.flush()?;
        Ok(session)
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn list(&self) -> Vec<Session> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().remove(session_id);
        self.flush()
    }

    /// Append a new Round (Request + Response) to a session in one
    /// transactional unit. The round's index is one greater than the
    /// session's current max, keeping `Round.index` dense and
    /// zero-based.
    pub fn append_round(
        &self,
        session_id: &str,
        request_id: &str,
        response_id: &str,
        user_content: &str,
    ) -> Result<Round> {
        let round = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| Error::NotFound(format!("session '{session_id}' not found")))?;

            let now = Utc::now();
            let round = Round {
                index: session.next_round_index(),
                request: Request {
                    id: request_id.to_owned(),
                    content: user_content.to_owned(),
                    created_at: now,
                },
                response: Response {
                    id: response_id.to_owned(),
                    created_at: now,
                },
            };
            session.rounds.push(round.clone());
            session.updated_at = now;
            round
        };
        self.flush()?;
        Ok(round)
    }

    pub fn update_metadata(
        &self,
        session_id: &str,
        title: Option<String>,
        description: Option<String>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<Session> {
        let session = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| Error::NotFound(format!("session '{session_id}' not found")))?;
            if let Some(title) = title {
                session.title = title;
            }
            if let Some(description) = description {
                session.description = description;
            }
            if let Some(metadata) = metadata {
                session.metadata = metadata;
            }
            session.updated_at = Utc::now();
            session.clone()
        };
        self.flush()?;
        Ok(session)
    }

    /// Persist the current session map to disk.
    pub fn flush(&self) -> Result<()> {
        let sessions = self.sessions.read();
        let json = serde_json::to_string_pretty(&*sessions)
            .map_err(|e| Error::Other(format!("serializing sessions: {e}")))?;
        std::fs::write(&self.path, json).map_err(Error::Io)?;
        Ok(())
    }

    /// Directory holding this store's per-session turn files.
    pub fn turns_dir(&self) -> PathBuf {
        self.path
            .parent()
            .unwrap_or(Path::new("."))
            .join("turns")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let session = store.create("s1", "w1").unwrap();
        assert_eq!(session.id, "s1");
        assert_eq!(store.get("s1").unwrap().id, "s1");
    }

    #[test]
    fn create_duplicate_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store.create("s1", "w1").unwrap();
        let err = store.create("s1", "w1").unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn round_indices_are_dense_and_increasing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store.create("s1", "w1").unwrap();

        let r0 = store.append_round("s1", "req-0", "resp-0", "hi").unwrap();
        let r1 = store.append_round("s1", "req-1", "resp-1", "again").unwrap();

        assert_eq!(r0.index, 0);
        assert_eq!(r1.index, 1);
    }

    #[test]
    fn append_round_missing_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let err = store
            .append_round("missing", "req", "resp", "hi")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn reload_from_disk_preserves_rounds() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SessionStore::new(dir.path()).unwrap();
            store.create("s1", "w1").unwrap();
            store.append_round("s1", "req-0", "resp-0", "hi").unwrap();
        }
        let store = SessionStore::new(dir.path()).unwrap();
        let session = store.get("s1").unwrap();
        assert_eq!(session.rounds.len(), 1);
    }
}
