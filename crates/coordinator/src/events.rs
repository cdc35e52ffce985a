//! The coordinator's turn notifier: the internal event stream `StreamingBridge`
//! subscribes to and translates into the wire event schema.

use sa_sessions::Turn;

/// Broadcast to every subscriber of a session's coordinator.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    Started { response_id: String },
    TurnUpdated { response_id: String, turn: Turn },
    Completed { response_id: String },
    Failed { response_id: String, error: String },
}

/// Bounded broadcast capacity. A stalled subscriber misses the oldest
/// entries (tokio's broadcast semantics) rather than blocking the
/// coordinator; `StreamingBridge` detects the gap and resyncs each Turn's
/// current persisted state, so no terminal update is silently lost — the
/// coalescing behavior §5 requires.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
