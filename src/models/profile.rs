use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::StreakError;
use crate::models::streak::WeekCredit;
use crate::services::dates::DateError;
use crate::services::streak::compute_display_streak;

/// The streak fields of a user profile.
///
/// `current_streak` counts weeks that were completed and already credited.
/// `is_current_week_complete` is a cached flag for the week containing today.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ProfileStreakState {
    pub user_id: Uuid,
    pub weekly_goal: i32,
    pub current_streak: i32,
    pub is_current_week_complete: bool,
    /// Monday of the last week whose rollover was written.
    pub last_credited_week: Option<NaiveDate>,
    pub last_credited_complete: bool,
    pub streak_before_credit: i32,
    /// IANA zone name, e.g. `Europe/Berlin`.
    pub time_zone: String,
    pub updated_at: DateTime<Utc>,
}

impl ProfileStreakState {
    pub fn timezone(&self) -> Result<Tz, DateError> {
        parse_time_zone(&self.time_zone)
    }

    pub fn display_streak(&self) -> i32 {
        compute_display_streak(self.current_streak, self.is_current_week_complete)
    }

    pub fn last_credit(&self) -> Option<WeekCredit> {
        self.last_credited_week.map(|week| WeekCredit {
            week,
            complete: self.last_credited_complete,
            streak_before: self.streak_before_credit,
        })
    }
}

pub fn parse_time_zone(name: &str) -> Result<Tz, DateError> {
    name.parse::<Tz>()
        .map_err(|_| DateError::InvalidDate(format!("unknown time zone {name:?}")))
}

fn validate_time_zone(name: &str) -> Result<(), ValidationError> {
    parse_time_zone(name)
        .map(|_| ())
        .map_err(|_| ValidationError::new("time_zone"))
}

/// Number of non-rest workouts per week, 1 through 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyGoal(i32);

impl WeeklyGoal {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 7;

    pub fn new(value: i32) -> Result<Self, StreakError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(StreakError::InvalidGoal(value))
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSettings {
    pub weekly_goal: Option<i32>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(range(min = 1, max = 7, message = "Weekly goal must be between 1 and 7"))]
    pub weekly_goal: Option<i32>,
    #[validate(custom = "validate_time_zone")]
    pub time_zone: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileSettings {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            weekly_goal: req.weekly_goal,
            time_zone: req.time_zone,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: ProfileStreakState,
    pub display_streak: i32,
}

impl From<ProfileStreakState> for ProfileResponse {
    fn from(profile: ProfileStreakState) -> Self {
        let display_streak = profile.display_streak();
        Self {
            profile,
            display_streak,
        }
    }
}
