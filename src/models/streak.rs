use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Outcome of evaluating the week that just ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RolloverDecision {
    /// Monday of the evaluated (previous) week.
    pub evaluated_week: NaiveDate,
    pub previous_week_complete: bool,
    pub new_streak: i32,
    pub should_reset: bool,
}

/// What the last streak write recorded about the week it evaluated.
///
/// Lets a later evaluation of the same week tell a redelivery apart from a
/// backfill or deletion that changed the week's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekCredit {
    pub week: NaiveDate,
    pub complete: bool,
    /// Streak before this week was applied.
    pub streak_before: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakOutcome {
    pub user_id: Uuid,
    pub rollover: RolloverDecision,
    pub streak_written: bool,
    pub current_streak: i32,
    pub is_current_week_complete: bool,
    pub display_streak: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakSummary {
    pub user_id: Uuid,
    pub weekly_goal: i32,
    pub current_streak: i32,
    pub is_current_week_complete: bool,
    pub display_streak: i32,
    pub workouts_this_week: usize,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub logged_today: bool,
}
