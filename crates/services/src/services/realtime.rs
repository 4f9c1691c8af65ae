use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Event delivered to a connected client as a single JSON text frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    pub event: String,
    pub payload: Value,
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("realtime session {0} is closed")]
    Closed(Uuid),
}

/// Sending side of one live connection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    connection_id: Uuid,
    sender: mpsc::UnboundedSender<RealtimeEvent>,
}

impl SessionHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RealtimeEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                connection_id: Uuid::new_v4(),
                sender,
            },
            receiver,
        )
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Queues the event without waiting for the client.
    pub fn send(&self, event: RealtimeEvent) -> Result<(), PushError> {
        self.sender
            .send(event)
            .map_err(|_| PushError::Closed(self.connection_id))
    }
}

/// Maps user ids to their live connection. Owned by the transport layer and
/// handed to the notification fan-out.
pub trait SessionRegistry: Send + Sync {
    /// Replaces any previous connection of the user.
    fn register(&self, user_id: Uuid, handle: SessionHandle);

    fn lookup(&self, user_id: Uuid) -> Option<SessionHandle>;

    /// Removes the user's entry only while it still belongs to `connection_id`.
    fn unregister(&self, user_id: Uuid, connection_id: Uuid) -> bool;

    fn push(&self, handle: &SessionHandle, event: &str, payload: Value) -> Result<(), PushError> {
        handle.send(RealtimeEvent {
            event: event.to_string(),
            payload,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    sessions: Arc<DashMap<Uuid, SessionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected_count(&self) -> usize {
        self.sessions.len()
    }
}

impl SessionRegistry for ConnectionRegistry {
    fn register(&self, user_id: Uuid, handle: SessionHandle) {
        if let Some(previous) = self.sessions.insert(user_id, handle) {
            tracing::debug!(
                %user_id,
                connection_id = %previous.connection_id(),
                "Replacing realtime session"
            );
        }
    }

    fn lookup(&self, user_id: Uuid) -> Option<SessionHandle> {
        self.sessions.get(&user_id).map(|entry| entry.value().clone())
    }

    fn unregister(&self, user_id: Uuid, connection_id: Uuid) -> bool {
        self.sessions
            .remove_if(&user_id, |_, handle| handle.connection_id() == connection_id)
            .is_some()
    }
}
