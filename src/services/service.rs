use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::store::{LogWindow, StreakStore};
use crate::error::{StoreOp, StreakError};
use crate::models::calendar::{CalendarMarking, MarkingPalette};
use crate::models::streak::{StreakOutcome, StreakSummary};
use crate::services::calendar::derive_calendar_marking;
use crate::services::changes::{ChangeFeed, ChangeKind};
use crate::services::dates::{
    end_of_day, local_date, start_of_day, week_monday, week_sunday, WeekWindow,
};
use crate::services::guard::UpdateGuard;
use crate::services::streak::{check_and_update_streak, compute_display_streak, count_workouts};

/// How far back the calendar looks when the caller gives no start date.
const DEFAULT_CALENDAR_DAYS: i64 = 90;

/// Streak operations for one store, shared across handlers and the refresher.
#[derive(Clone)]
pub struct StreakService {
    store: Arc<dyn StreakStore>,
    changes: ChangeFeed,
    guard: UpdateGuard,
}

impl StreakService {
    pub fn new(store: Arc<dyn StreakStore>, changes: ChangeFeed) -> Self {
        Self {
            store,
            changes,
            guard: UpdateGuard::new(),
        }
    }

    /// Recomputes and persists the user's streak from a fresh read.
    ///
    /// Fails fast with `ConcurrentUpdate` if a recomputation for the same
    /// user is already running.
    pub async fn refresh(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<StreakOutcome, StreakError> {
        let _ticket = self.guard.try_acquire(user_id)?;

        let profile = self
            .store
            .fetch_profile(user_id)
            .await
            .map_err(StreakError::persistence(StoreOp::FetchProfile))?;
        let tz = profile.timezone()?;
        let since = WeekWindow::containing(now, &tz)?.previous(&tz)?.start;
        let logs = self
            .store
            .fetch_workout_logs(user_id, LogWindow::Since(since))
            .await
            .map_err(StreakError::persistence(StoreOp::FetchWorkoutLogs))?;

        let outcome = check_and_update_streak(self.store.as_ref(), user_id, &logs, &profile, now).await?;
        self.changes.publish(user_id, ChangeKind::StreakUpdated);

        tracing::debug!(
            user_id = %user_id,
            streak = outcome.current_streak,
            week_complete = outcome.is_current_week_complete,
            "Streak refreshed"
        );
        Ok(outcome)
    }

    /// Read-only view of the persisted streak plus this week's progress.
    pub async fn summary(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<StreakSummary, StreakError> {
        let profile = self
            .store
            .fetch_profile(user_id)
            .await
            .map_err(StreakError::persistence(StoreOp::FetchProfile))?;
        let tz = profile.timezone()?;
        let week = WeekWindow::containing(now, &tz)?;
        let logs = self
            .store
            .fetch_workout_logs(user_id, LogWindow::Since(week.start))
            .await
            .map_err(StreakError::persistence(StoreOp::FetchWorkoutLogs))?;

        let day_start = start_of_day(now, &tz)?;
        let day_end = end_of_day(now, &tz)?;
        let logged_today = logs
            .iter()
            .any(|log| day_start <= log.completed_at && log.completed_at <= day_end);

        Ok(StreakSummary {
            user_id,
            weekly_goal: profile.weekly_goal,
            current_streak: profile.current_streak,
            is_current_week_complete: profile.is_current_week_complete,
            display_streak: compute_display_streak(
                profile.current_streak,
                profile.is_current_week_complete,
            ),
            workouts_this_week: count_workouts(&logs, &week),
            week_start: week.monday,
            week_end: week.sunday(),
            logged_today,
        })
    }

    /// Calendar markings for `[from, to]` in the user's local dates.
    ///
    /// The range is widened to whole weeks (Monday of `from` through Sunday
    /// of `to`) so partially covered weeks are still counted in full.
    pub async fn calendar(
        &self,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        now: DateTime<Utc>,
        palette: &MarkingPalette,
    ) -> Result<CalendarMarking, StreakError> {
        let profile = self
            .store
            .fetch_profile(user_id)
            .await
            .map_err(StreakError::persistence(StoreOp::FetchProfile))?;
        let tz = profile.timezone()?;
        let today = local_date(now, &tz);
        let from = from.unwrap_or_else(|| today - Duration::days(DEFAULT_CALENDAR_DAYS));
        let to = to.unwrap_or(today);

        let window = LogWindow::Between(week_monday(from)?, week_sunday(to)?);
        let logs = self
            .store
            .fetch_workout_logs(user_id, window)
            .await
            .map_err(StreakError::persistence(StoreOp::FetchWorkoutLogs))?;

        let marking = derive_calendar_marking(
            &logs,
            profile.weekly_goal,
            profile.is_current_week_complete,
            now,
            &tz,
            palette,
        )?;
        Ok(marking)
    }
}
