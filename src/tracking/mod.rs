//! Session tracking: fire-and-forget notifications of quiz progress.
//!
//! The engine calls [`SessionNotifier::notify`] after a transition has been
//! committed locally. Notifiers must return immediately and must never fail
//! the caller; delivery is best effort, at most once.

mod http;

pub use http::HttpNotifier;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// A tracked moment in a quiz session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session began at the start node.
    Start {
        /// Quiz being taken.
        quiz_id: String,
        /// Session identifier.
        session_id: String,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// An option was selected.
    Answer {
        /// Quiz being taken.
        quiz_id: String,
        /// Session identifier.
        session_id: String,
        /// Question answered.
        node_id: String,
        /// Option chosen.
        option_id: String,
        /// Option text at selection time.
        option_text: String,
        /// Tags the option contributed.
        tags: Vec<String>,
        /// When it happened.
        at: DateTime<Utc>,
    },
    /// The session reached its results.
    Complete {
        /// Quiz being taken.
        quiz_id: String,
        /// Session identifier.
        session_id: String,
        /// All tags collected along the path.
        collected_tags: Vec<String>,
        /// Number of answers given.
        path_length: usize,
        /// When it happened.
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Event kind as sent on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Start { .. } => "start",
            SessionEvent::Answer { .. } => "answer",
            SessionEvent::Complete { .. } => "complete",
        }
    }

    /// Session the event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::Start { session_id, .. }
            | SessionEvent::Answer { session_id, .. }
            | SessionEvent::Complete { session_id, .. } => session_id,
        }
    }
}

/// Receives session events. Implementations must not block.
pub trait SessionNotifier: Send + Sync {
    /// Deliver an event; errors are handled (and logged) by the notifier.
    fn notify(&self, event: SessionEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl SessionNotifier for NoopNotifier {
    fn notify(&self, _event: SessionEvent) {}
}

/// Forwards events into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving half of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionNotifier for ChannelNotifier {
    fn notify(&self, event: SessionEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!(
                kind = e.0.kind(),
                session_id = %e.0.session_id(),
                "Tracking channel closed, dropping event"
            );
        }
    }
}
