use std::env;
use std::time::Duration;

use crate::models::calendar::MarkingPalette;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    /// Shared secret of the identity provider that issues access tokens.
    pub jwt_secret: String,

    pub refresh_debounce_ms: u64,
    pub change_feed_capacity: usize,
    pub default_weekly_goal: i32,

    pub palette: MarkingPalette,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = MarkingPalette::default();

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            refresh_debounce_ms: env::var("STREAK_REFRESH_DEBOUNCE_MS")
                .unwrap_or_else(|_| "750".into())
                .parse()
                .unwrap_or(750),
            change_feed_capacity: env::var("CHANGE_FEED_CAPACITY")
                .unwrap_or_else(|_| "256".into())
                .parse()
                .unwrap_or(256),
            default_weekly_goal: env::var("DEFAULT_WEEKLY_GOAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|goal| (1..=7).contains(goal))
                .unwrap_or(3),

            palette: MarkingPalette {
                active_dot: env::var("MARK_ACTIVE_DOT").unwrap_or(defaults.active_dot),
                rest_dot: env::var("MARK_REST_DOT").unwrap_or(defaults.rest_dot),
                streak_background: env::var("MARK_STREAK_BG")
                    .unwrap_or(defaults.streak_background),
                streak_text: env::var("MARK_STREAK_TEXT").unwrap_or(defaults.streak_text),
                error: env::var("MARK_ERROR").unwrap_or(defaults.error),
            },
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:3000".into(),
            jwt_secret: "test-secret".into(),
            refresh_debounce_ms: 10,
            change_feed_capacity: 64,
            default_weekly_goal: 3,
            palette: MarkingPalette::default(),
        }
    }
}
