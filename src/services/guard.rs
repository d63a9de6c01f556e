use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use uuid::Uuid;

use crate::error::StreakError;

/// Single-flight guard: at most one streak recomputation per user at a time.
#[derive(Clone, Default)]
pub struct UpdateGuard {
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

/// Held for the duration of one recomputation; releases the user on drop.
#[derive(Debug)]
pub struct UpdateTicket {
    user_id: Uuid,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl UpdateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, user_id: Uuid) -> Result<UpdateTicket, StreakError> {
        if !lock(&self.in_flight).insert(user_id) {
            tracing::debug!(user_id = %user_id, "Streak update already in flight");
            return Err(StreakError::ConcurrentUpdate(user_id));
        }

        Ok(UpdateTicket {
            user_id,
            in_flight: Arc::clone(&self.in_flight),
        })
    }
}

impl Drop for UpdateTicket {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.user_id);
    }
}

// The set stays consistent even if a holder panicked.
fn lock(set: &Mutex<HashSet<Uuid>>) -> MutexGuard<'_, HashSet<Uuid>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}
