use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

use crate::error::StreakError;
use crate::services::changes::ChangeEvent;
use crate::services::service::StreakService;

/// Recomputes streaks in the background after workout or profile changes.
///
/// Bursts of events for one user collapse into a single refresh `debounce`
/// after the last event. Each due refresh runs on its own task so a slow
/// store call never holds up other users or the feed. A refresh that hits an
/// in-flight one is retried after another `debounce`.
pub fn spawn_streak_refresher(
    service: StreakService,
    mut rx: broadcast::Receiver<ChangeEvent>,
    debounce: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut pending: HashMap<Uuid, Instant> = HashMap::new();
        let (retry_tx, mut retry_rx) = mpsc::unbounded_channel::<Uuid>();

        loop {
            let next_due = pending.values().min().copied();

            tokio::select! {
                received = rx.recv() => match received {
                    Ok(event) if event.kind.triggers_refresh() => {
                        pending.insert(event.user_id, Instant::now() + debounce);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "Streak refresher lagged behind change feed");
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Change feed closed, stopping streak refresher");
                        break;
                    }
                },
                Some(user_id) = retry_rx.recv() => {
                    pending
                        .entry(user_id)
                        .or_insert_with(|| Instant::now() + debounce);
                }
                _ = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                    let now = Instant::now();
                    let due: Vec<Uuid> = pending
                        .iter()
                        .filter(|(_, at)| **at <= now)
                        .map(|(user_id, _)| *user_id)
                        .collect();

                    for user_id in due {
                        pending.remove(&user_id);
                        tokio::spawn(refresh_user(service.clone(), user_id, retry_tx.clone()));
                    }
                }
            }
        }
    })
}

async fn refresh_user(service: StreakService, user_id: Uuid, retry: mpsc::UnboundedSender<Uuid>) {
    match service.refresh(user_id, Utc::now()).await {
        Ok(outcome) => {
            tracing::debug!(
                user_id = %user_id,
                display_streak = outcome.display_streak,
                "Background streak refresh complete"
            );
        }
        Err(StreakError::ConcurrentUpdate(_)) => {
            // Receiver is gone only once the refresher has stopped
            let _ = retry.send(user_id);
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Background streak refresh failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::memory::{blank_profile, MemoryStreakStore};
    use crate::services::changes::{ChangeFeed, ChangeKind};
    use crate::services::streak::fixtures::workout;

    async fn wait_for_week_complete(store: &MemoryStreakStore, user_id: Uuid) -> bool {
        for _ in 0..100 {
            if store
                .profile(user_id)
                .await
                .is_some_and(|p| p.is_current_week_complete)
            {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_workout_event_triggers_refresh() {
        let user = Uuid::new_v4();
        let store = Arc::new(MemoryStreakStore::new(1));
        store.put_profile(blank_profile(user, 1)).await;
        let now = Utc::now().to_rfc3339();
        store.push_log(workout(user, &now)).await;

        let feed = ChangeFeed::new(16);
        let service = StreakService::new(store.clone(), feed.clone());
        let handle = spawn_streak_refresher(service, feed.subscribe_all(), Duration::from_millis(20));

        feed.publish(user, ChangeKind::WorkoutLogged);
        assert!(wait_for_week_complete(&store, user).await);

        handle.abort();
    }

    #[tokio::test]
    async fn test_burst_collapses_into_one_refresh() {
        let user = Uuid::new_v4();
        let store = Arc::new(MemoryStreakStore::new(1));
        store.put_profile(blank_profile(user, 1)).await;
        store.push_log(workout(user, &Utc::now().to_rfc3339())).await;

        let feed = ChangeFeed::new(16);
        let mut updates = feed.on_change(user);
        let service = StreakService::new(store.clone(), feed.clone());
        let handle = spawn_streak_refresher(service, feed.subscribe_all(), Duration::from_millis(50));

        for _ in 0..5 {
            feed.publish(user, ChangeKind::WorkoutLogged);
        }
        assert!(wait_for_week_complete(&store, user).await);

        // Skip the five WorkoutLogged events, then expect exactly one StreakUpdated.
        let mut streak_updates = 0;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(200), updates.recv()).await
        {
            if event.kind == ChangeKind::StreakUpdated {
                streak_updates += 1;
            }
        }
        assert_eq!(streak_updates, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_slow_user_does_not_block_others() {
        let slow = Uuid::new_v4();
        let fast = Uuid::new_v4();
        let store = Arc::new(MemoryStreakStore::new(1));
        let now = Utc::now().to_rfc3339();
        for user in [slow, fast] {
            store.put_profile(blank_profile(user, 1)).await;
            store.push_log(workout(user, &now)).await;
        }
        store.slow_down(slow, Duration::from_secs(5)).await;

        let feed = ChangeFeed::new(16);
        let service = StreakService::new(store.clone(), feed.clone());
        let handle = spawn_streak_refresher(service, feed.subscribe_all(), Duration::from_millis(20));

        feed.publish(slow, ChangeKind::WorkoutLogged);
        // Let the slow refresh start before the second user's event arrives.
        tokio::time::sleep(Duration::from_millis(60)).await;
        feed.publish(fast, ChangeKind::WorkoutLogged);

        assert!(wait_for_week_complete(&store, fast).await);
        assert!(!store.profile(slow).await.unwrap().is_current_week_complete);

        handle.abort();
    }

    #[tokio::test]
    async fn test_stops_when_feed_closes() {
        let store = Arc::new(MemoryStreakStore::new(1));
        let feed = ChangeFeed::new(4);
        let rx = feed.subscribe_all();
        let service = StreakService::new(store, ChangeFeed::new(4));
        let handle = spawn_streak_refresher(service, rx, Duration::from_millis(10));

        drop(feed);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("refresher should stop")
            .unwrap();
    }
}
