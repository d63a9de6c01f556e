//! In-memory `StreakStore` for tests, with per-operation failure injection.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::store::{LogWindow, StoreError, StoreResult, StreakStore};
use crate::error::StoreOp;
use crate::models::profile::{ProfileSettings, ProfileStreakState};
use crate::models::streak::WeekCredit;
use crate::models::workout::{NewWorkoutLog, WorkoutLogEntry};

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<Uuid, ProfileStreakState>,
    logs: Vec<WorkoutLogEntry>,
    failing: Vec<StoreOp>,
    slow_profiles: HashMap<Uuid, Duration>,
    streak_writes: usize,
}

pub struct MemoryStreakStore {
    state: Mutex<MemoryState>,
    default_goal: i32,
}

impl MemoryStreakStore {
    pub fn new(default_goal: i32) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            default_goal,
        }
    }

    pub async fn put_profile(&self, profile: ProfileStreakState) {
        self.state
            .lock()
            .await
            .profiles
            .insert(profile.user_id, profile);
    }

    pub async fn profile(&self, user_id: Uuid) -> Option<ProfileStreakState> {
        self.state.lock().await.profiles.get(&user_id).cloned()
    }

    pub async fn push_log(&self, log: WorkoutLogEntry) {
        self.state.lock().await.logs.push(log);
    }

    pub async fn fail_on(&self, op: StoreOp) {
        self.state.lock().await.failing.push(op);
    }

    /// Makes every profile fetch for `user_id` take at least `delay`.
    pub async fn slow_down(&self, user_id: Uuid, delay: Duration) {
        self.state.lock().await.slow_profiles.insert(user_id, delay);
    }

    pub async fn streak_writes(&self) -> usize {
        self.state.lock().await.streak_writes
    }

    fn check(state: &MemoryState, op: StoreOp) -> StoreResult<()> {
        if state.failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("injected failure: {op}")));
        }
        Ok(())
    }
}

pub fn blank_profile(user_id: Uuid, weekly_goal: i32) -> ProfileStreakState {
    ProfileStreakState {
        user_id,
        weekly_goal,
        current_streak: 0,
        is_current_week_complete: false,
        last_credited_week: None,
        last_credited_complete: false,
        streak_before_credit: 0,
        time_zone: "UTC".into(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl StreakStore for MemoryStreakStore {
    async fn fetch_workout_logs(
        &self,
        user_id: Uuid,
        window: LogWindow,
    ) -> StoreResult<Vec<WorkoutLogEntry>> {
        let state = self.state.lock().await;
        Self::check(&state, StoreOp::FetchWorkoutLogs)?;
        let mut logs: Vec<WorkoutLogEntry> = state
            .logs
            .iter()
            .filter(|log| log.user_id == user_id)
            .filter(|log| match window {
                LogWindow::All => true,
                LogWindow::Since(since) => log.completed_at >= since,
                LogWindow::Between(from, to) => (from..=to).contains(&log.local_date),
            })
            .cloned()
            .collect();
        logs.sort_by_key(|log| log.completed_at);
        Ok(logs)
    }

    async fn fetch_profile(&self, user_id: Uuid) -> StoreResult<ProfileStreakState> {
        let delay = self.state.lock().await.slow_profiles.get(&user_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        Self::check(&state, StoreOp::FetchProfile)?;
        let default_goal = self.default_goal;
        Ok(state
            .profiles
            .entry(user_id)
            .or_insert_with(|| blank_profile(user_id, default_goal))
            .clone())
    }

    async fn write_current_streak(
        &self,
        user_id: Uuid,
        value: i32,
        credit: WeekCredit,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, StoreOp::WriteCurrentStreak)?;
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("Profile {} not found", user_id)))?;
        profile.current_streak = value;
        profile.last_credited_week = Some(credit.week);
        profile.last_credited_complete = credit.complete;
        profile.streak_before_credit = credit.streak_before;
        state.streak_writes += 1;
        Ok(())
    }

    async fn write_week_complete(&self, user_id: Uuid, value: bool) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        Self::check(&state, StoreOp::WriteWeekComplete)?;
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("Profile {} not found", user_id)))?;
        profile.is_current_week_complete = value;
        Ok(())
    }

    async fn insert_workout_log(&self, log: NewWorkoutLog) -> StoreResult<WorkoutLogEntry> {
        let mut state = self.state.lock().await;
        let taken = state
            .logs
            .iter()
            .any(|l| l.user_id == log.user_id && l.local_date == log.local_date);
        if taken {
            return Err(StoreError::Conflict(format!(
                "An entry is already logged for {}",
                log.local_date
            )));
        }
        let entry = WorkoutLogEntry {
            id: Uuid::new_v4(),
            user_id: log.user_id,
            completed_at: log.completed_at,
            local_date: log.local_date,
            is_rest_day: log.is_rest_day,
            note: log.note,
            created_at: Utc::now(),
        };
        state.logs.push(entry.clone());
        Ok(entry)
    }

    async fn delete_workout_log(
        &self,
        user_id: Uuid,
        log_id: Uuid,
    ) -> StoreResult<Option<WorkoutLogEntry>> {
        let mut state = self.state.lock().await;
        let position = state
            .logs
            .iter()
            .position(|l| l.id == log_id && l.user_id == user_id);
        Ok(position.map(|i| state.logs.remove(i)))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        settings: ProfileSettings,
    ) -> StoreResult<ProfileStreakState> {
        let mut state = self.state.lock().await;
        let default_goal = self.default_goal;
        let profile = state
            .profiles
            .entry(user_id)
            .or_insert_with(|| blank_profile(user_id, default_goal));
        if let Some(goal) = settings.weekly_goal {
            profile.weekly_goal = goal;
        }
        if let Some(zone) = settings.time_zone {
            profile.time_zone = zone;
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
