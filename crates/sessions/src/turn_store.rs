//! Per-session Turn persistence.
//!
//! Each session gets its own `<sessionId>.json` file under
//! `sessions/turns/`, holding the full ordered Turn list for that session.
//! Unlike an append-only transcript, Turns mutate in place while
//! `streaming` and are rewritten whole on every update — the coordinator
//! calls [`TurnStore::upsert`] on every observed delta so subscribers
//! reading the same file see the latest persisted state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use sa_domain::error::{Error, Result};

use crate::turn::Turn;

pub struct TurnStore {
    dir: PathBuf,
    /// In-memory cache of each session's turn list, mirrored to disk.
    cache: RwLock<HashMap<String, Vec<Turn>>>,
}

impl TurnStore {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(Error::Io)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    fn load(&self, session_id: &str) -> Result<Vec<Turn>> {
        if let Some(turns) = self.cache.read().get(session_id) {
            return Ok(turns.clone());
        }
        let path = self.path_for(session_id);
        let turns = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            Vec::new()
        };
        self.cache.write().insert(session_id.to_owned(), turns.clone());
        Ok(turns)
    }

    /// All turns for a session, in persisted order.
    pub fn list(&self, session_id: &str) -> Result<Vec<Turn>> {
        self.load(session_id)
    }

    /// All turns belonging to one response, ordered by `index`.
    pub fn for_response(&self, session_id: &str, response_id: &str) -> Result<Vec<Turn>> {
        let mut turns: Vec<Turn> = self
            .load(session_id)?
            .into_iter()
            .filter(|t| t.response_id == response_id)
            .collect();
        turns.sort_by_key(|t| t.index);
        Ok(turns)
    }

    /// The next dense, zero-based turn index for a response.
    pub fn next_turn_index(&self, session_id: &str, response_id: &str) -> Result<u32> {
        Ok(self.for_response(session_id, response_id)?.len() as u32)
    }

    /// Insert a new turn or overwrite an existing one at the same
    /// `(response_id, index)`, then persist the whole session file.
    pub fn upsert(&self, session_id: &str, turn: Turn) -> Result<()> {
        let mut turns = self.load(session_id)?;
        match turns
            .iter()
            .position(|t| t.response_id == turn.response_id && t.index == turn.index)
        {
            Some(pos) => turns[pos] = turn,
            None => turns.push(turn),
        }
        self.cache.write().insert(session_id.to_owned(), turns.clone());

        let json = serde_json::to_string_pretty(&turns)
            .map_err(|e| Error::Other(format!("serializing turns: {e}")))?;
        std::fs::write(self.path_for(session_id), json).map_err(Error::Io)?;
        Ok(())
    }

    /// Drop the in-memory cache entry for a session (the file on disk is
    /// left untouched). Used when a coordinator is released so the next
    /// instance re-reads from disk rather than reusing a stale cache.
    pub fn evict(&self, session_id: &str) {
        self.cache.write().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::TurnStatus;

    #[test]
    fn upsert_then_list_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TurnStore::new(dir.path()).unwrap();
        let turn = Turn::new("resp-0", 0);
        store.upsert("s1", turn.clone()).unwrap();

        let turns = store.list("s1").unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].response_id, "resp-0");
    }

    #[test]
    fn upsert_overwrites_same_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = TurnStore::new(dir.path()).unwrap();
        let mut turn = Turn::new("resp-0", 0);
        store.upsert("s1", turn.clone()).unwrap();

        turn.content = "hello".into();
        turn.complete();
        store.upsert("s1", turn).unwrap();

        let turns = store.list("s1").unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[0].status, TurnStatus::Completed);
    }

    #[test]
    fn next_turn_index_is_dense_per_response() {
        let dir = tempfile::tempdir().unwrap();
        let store = TurnStore::new(dir.path()).unwrap();
        assert_eq!(store.next_turn_index("s1", "resp-0").unwrap(), 0);

        store.upsert("s1", Turn::new("resp-0", 0)).unwrap();
        assert_eq!(store.next_turn_index("s1", "resp-0").unwrap(), 1);

        // A different response starts its own sequence at 0.
        assert_eq!(store.next_turn_index("s1", "resp-1").unwrap(), 0);
    }
}
