//! Week completion and streak rollover.
//!
//! The functions at the top are pure over their arguments; only
//! [`check_and_update_streak`] touches the store.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::db::store::StreakStore;
use crate::error::{StoreOp, StreakError};
use crate::models::profile::{ProfileStreakState, WeeklyGoal};
use crate::models::streak::{RolloverDecision, StreakOutcome, WeekCredit};
use crate::models::workout::WorkoutLogEntry;
use crate::services::dates::{DateResult, WeekWindow};

/// Non-rest entries whose `completed_at` falls inside `window`.
pub fn count_workouts(logs: &[WorkoutLogEntry], window: &WeekWindow) -> usize {
    logs.iter()
        .filter(|log| !log.is_rest_day && window.contains(log.completed_at))
        .count()
}

/// A week is complete when its non-rest count reaches `goal`. A goal of zero
/// or less can never be met.
pub fn is_week_complete(logs: &[WorkoutLogEntry], window: &WeekWindow, goal: i32) -> bool {
    if goal <= 0 {
        return false;
    }
    count_workouts(logs, window) >= goal as usize
}

pub fn compute_display_streak(current_streak: i32, is_current_week_complete: bool) -> i32 {
    current_streak.saturating_add(i32::from(is_current_week_complete))
}

/// Decides the streak after the week before `now` has ended.
///
/// A complete previous week extends the streak by one; an incomplete one
/// resets a running streak to zero and leaves a zero streak alone.
pub fn evaluate_week_rollover<Tz: TimeZone>(
    logs: &[WorkoutLogEntry],
    goal: i32,
    current_streak_in_db: i32,
    now: DateTime<Utc>,
    tz: &Tz,
) -> DateResult<RolloverDecision> {
    let previous = WeekWindow::containing(now, tz)?.previous(tz)?;
    let complete = is_week_complete(logs, &previous, goal);
    let current = current_streak_in_db.max(0);

    let (new_streak, should_reset) = if complete {
        (current.saturating_add(1), false)
    } else if current > 0 {
        (0, true)
    } else {
        (0, false)
    };

    Ok(RolloverDecision {
        evaluated_week: previous.monday,
        previous_week_complete: complete,
        new_streak,
        should_reset,
    })
}

/// Applies the rollover decision and refreshes the current-week flag.
///
/// The streak write happens first and records the evaluated week with its
/// result. Re-evaluating a week with the same result is a no-op. If logs
/// were added or removed since and the result flipped, the week is re-applied
/// on top of the streak it started from. The week-complete write is always
/// issued afterwards.
pub async fn check_and_update_streak(
    store: &dyn StreakStore,
    user_id: Uuid,
    logs: &[WorkoutLogEntry],
    profile: &ProfileStreakState,
    now: DateTime<Utc>,
) -> Result<StreakOutcome, StreakError> {
    let goal = WeeklyGoal::new(profile.weekly_goal)?;
    let tz = profile.timezone()?;

    let evaluated_week = WeekWindow::containing(now, &tz)?.previous(&tz)?.monday;
    let prior_credit = profile
        .last_credit()
        .filter(|credit| credit.week == evaluated_week);
    let base_streak = prior_credit.map_or(profile.current_streak, |credit| credit.streak_before);

    let rollover = evaluate_week_rollover(logs, goal.get(), base_streak, now, &tz)?;
    let already_applied =
        prior_credit.is_some_and(|credit| credit.complete == rollover.previous_week_complete);

    let mut current_streak = profile.current_streak;
    let streak_written = !already_applied
        && (prior_credit.is_some() || rollover.new_streak != profile.current_streak);
    if streak_written {
        let credit = WeekCredit {
            week: rollover.evaluated_week,
            complete: rollover.previous_week_complete,
            streak_before: base_streak.max(0),
        };
        store
            .write_current_streak(user_id, rollover.new_streak, credit)
            .await
            .map_err(StreakError::persistence(StoreOp::WriteCurrentStreak))?;
        current_streak = rollover.new_streak;
        tracing::info!(
            user_id = %user_id,
            week = %rollover.evaluated_week,
            previous = profile.current_streak,
            streak = current_streak,
            reset = rollover.should_reset,
            corrected = prior_credit.is_some(),
            "Streak rolled over"
        );
    } else if already_applied {
        tracing::debug!(
            user_id = %user_id,
            week = %rollover.evaluated_week,
            "Week already credited, skipping streak write"
        );
    }

    let current_week = WeekWindow::containing(now, &tz)?;
    let week_complete = is_week_complete(logs, &current_week, goal.get());
    store
        .write_week_complete(user_id, week_complete)
        .await
        .map_err(|source| {
            if streak_written {
                tracing::warn!(
                    user_id = %user_id,
                    streak = current_streak,
                    "Streak written but week-complete flag was not"
                );
            }
            StreakError::Persistence {
                op: StoreOp::WriteWeekComplete,
                source,
            }
        })?;

    Ok(StreakOutcome {
        user_id,
        rollover,
        streak_written,
        current_streak,
        is_current_week_complete: week_complete,
        display_streak: compute_display_streak(current_streak, week_complete),
    })
}
