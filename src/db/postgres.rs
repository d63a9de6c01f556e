use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::store::{LogWindow, StoreError, StoreResult, StreakStore};
use crate::models::profile::{ProfileSettings, ProfileStreakState};
use crate::models::streak::WeekCredit;
use crate::models::workout::{NewWorkoutLog, WorkoutLogEntry};

#[derive(Clone)]
pub struct PgStreakStore {
    db: PgPool,
    default_goal: i32,
}

impl PgStreakStore {
    pub fn new(db: PgPool, default_goal: i32) -> Self {
        Self { db, default_goal }
    }

    fn profile_missing(user_id: Uuid) -> StoreError {
        StoreError::NotFound(format!("Profile {} not found", user_id))
    }
}

#[async_trait]
impl StreakStore for PgStreakStore {
    async fn fetch_workout_logs(
        &self,
        user_id: Uuid,
        window: LogWindow,
    ) -> StoreResult<Vec<WorkoutLogEntry>> {
        let logs = match window {
            LogWindow::All => {
                sqlx::query_as::<_, WorkoutLogEntry>(
                    r#"
                    SELECT * FROM workout_logs
                    WHERE user_id = $1
                    ORDER BY completed_at ASC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.db)
                .await?
            }
            LogWindow::Since(since) => {
                sqlx::query_as::<_, WorkoutLogEntry>(
                    r#"
                    SELECT * FROM workout_logs
                    WHERE user_id = $1 AND completed_at >= $2
                    ORDER BY completed_at ASC
                    "#,
                )
                .bind(user_id)
                .bind(since)
                .fetch_all(&self.db)
                .await?
            }
            LogWindow::Between(from, to) => {
                sqlx::query_as::<_, WorkoutLogEntry>(
                    r#"
                    SELECT * FROM workout_logs
                    WHERE user_id = $1 AND local_date BETWEEN $2 AND $3
                    ORDER BY completed_at ASC
                    "#,
                )
                .bind(user_id)
                .bind(from)
                .bind(to)
                .fetch_all(&self.db)
                .await?
            }
        };

        Ok(logs)
    }

    async fn fetch_profile(&self, user_id: Uuid) -> StoreResult<ProfileStreakState> {
        // No-op update on conflict so RETURNING yields the existing row
        let profile = sqlx::query_as::<_, ProfileStreakState>(
            r#"
            INSERT INTO profiles (user_id, weekly_goal)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
                SET user_id = profiles.user_id
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(self.default_goal)
        .fetch_one(&self.db)
        .await?;

        Ok(profile)
    }

    async fn write_current_streak(
        &self,
        user_id: Uuid,
        value: i32,
        credit: WeekCredit,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                current_streak = $2,
                last_credited_week = $3,
                last_credited_complete = $4,
                streak_before_credit = $5,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(value)
        .bind(credit.week)
        .bind(credit.complete)
        .bind(credit.streak_before)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::profile_missing(user_id));
        }
        Ok(())
    }

    async fn write_week_complete(&self, user_id: Uuid, value: bool) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                is_current_week_complete = $2,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(value)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::profile_missing(user_id));
        }
        Ok(())
    }

    async fn insert_workout_log(&self, log: NewWorkoutLog) -> StoreResult<WorkoutLogEntry> {
        let inserted = sqlx::query_as::<_, WorkoutLogEntry>(
            r#"
            INSERT INTO workout_logs (id, user_id, completed_at, local_date, is_rest_day, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, local_date) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(log.user_id)
        .bind(log.completed_at)
        .bind(log.local_date)
        .bind(log.is_rest_day)
        .bind(&log.note)
        .fetch_optional(&self.db)
        .await?;

        inserted.ok_or_else(|| {
            StoreError::Conflict(format!("An entry is already logged for {}", log.local_date))
        })
    }

    async fn delete_workout_log(
        &self,
        user_id: Uuid,
        log_id: Uuid,
    ) -> StoreResult<Option<WorkoutLogEntry>> {
        let deleted = sqlx::query_as::<_, WorkoutLogEntry>(
            "DELETE FROM workout_logs WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(log_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(deleted)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        settings: ProfileSettings,
    ) -> StoreResult<ProfileStreakState> {
        // Make sure the row exists before patching it
        self.fetch_profile(user_id).await?;

        let profile = sqlx::query_as::<_, ProfileStreakState>(
            r#"
            UPDATE profiles SET
                weekly_goal = COALESCE($2, weekly_goal),
                time_zone = COALESCE($3, time_zone),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(settings.weekly_goal)
        .bind(settings.time_zone)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| Self::profile_missing(user_id))?;

        Ok(profile)
    }

    async fn ping(&self) -> StoreResult<()> {
        if self.db.is_closed() {
            return Err(StoreError::Unavailable("connection pool is closed".into()));
        }
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}
