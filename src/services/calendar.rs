use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::models::calendar::{CalendarMarking, MarkingPalette};
use crate::models::workout::WorkoutLogEntry;
use crate::services::dates::{date_key, local_date, to_local_date_key, week_monday, DateResult};

/// Builds the per-day marking map for a calendar widget.
///
/// Every entry gets a dot (rest or active color, last entry per day wins).
/// Weeks whose non-rest count reaches `goal` get a Monday-to-Sunday streak
/// band; the week containing today additionally needs
/// `is_current_week_complete`. If nothing was logged today, today carries the
/// error dot. Dot and band fields merge on the same day.
pub fn derive_calendar_marking<Tz: TimeZone>(
    logs: &[WorkoutLogEntry],
    goal: i32,
    is_current_week_complete: bool,
    now: DateTime<Utc>,
    tz: &Tz,
    palette: &MarkingPalette,
) -> DateResult<CalendarMarking> {
    let mut marking = CalendarMarking::new();
    let mut workouts_per_week: BTreeMap<NaiveDate, i32> = BTreeMap::new();

    for log in logs {
        let date = local_date(log.completed_at, tz);
        let dot = if log.is_rest_day {
            &palette.rest_dot
        } else {
            &palette.active_dot
        };
        marking.entry(date_key(date)).or_default().set_dot(dot);

        let workouts = workouts_per_week.entry(week_monday(date)?).or_insert(0);
        if !log.is_rest_day {
            *workouts += 1;
        }
    }

    let current_monday = week_monday(local_date(now, tz))?;
    for (monday, workouts) in workouts_per_week {
        let flagged = monday != current_monday || is_current_week_complete;
        if goal <= 0 || workouts < goal || !flagged {
            continue;
        }
        for offset in 0..7 {
            let day = marking
                .entry(date_key(monday + Duration::days(offset)))
                .or_default();
            day.set_range(&palette.streak_background, &palette.streak_text);
            match offset {
                0 => day.starting_day = true,
                6 => day.ending_day = true,
                _ => {}
            }
        }
    }

    let today = marking.entry(to_local_date_key(now, tz)).or_default();
    if !today.has_dot() {
        today.set_dot(&palette.error);
    }

    Ok(marking)
}
