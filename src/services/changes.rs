//! Realtime change notifications, fanned out per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    WorkoutLogged,
    WorkoutDeleted,
    ProfileChanged,
    StreakUpdated,
}

impl ChangeKind {
    /// Whether the change can move a user's streak. `StreakUpdated` is the
    /// result of a recomputation and must not trigger another one.
    pub fn triggers_refresh(self) -> bool {
        !matches!(self, ChangeKind::StreakUpdated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub user_id: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, user_id: Uuid, kind: ChangeKind) {
        let event = ChangeEvent {
            kind,
            user_id,
            at: Utc::now(),
        };
        // Err only means nobody is listening right now
        if self.tx.send(event).is_err() {
            tracing::trace!(user_id = %user_id, ?kind, "Change published without subscribers");
        }
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn on_change(&self, user_id: Uuid) -> UserChanges {
        UserChanges {
            user_id,
            rx: self.tx.subscribe(),
        }
    }

    pub fn off_change(&self, changes: UserChanges) {
        tracing::debug!(user_id = %changes.user_id, "Change subscription closed");
        drop(changes);
    }
}

/// A subscription that only yields one user's events.
pub struct UserChanges {
    user_id: Uuid,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl UserChanges {
    /// Next event for this user, or `None` once the feed is closed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.user_id == self.user_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        user_id = %self.user_id,
                        skipped = skipped,
                        "Change subscriber lagged"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
