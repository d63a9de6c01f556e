use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Rendering directive for one calendar day.
///
/// Dot fields (`marked`, `dot_color`) and streak-range fields (`starting_day`,
/// `ending_day`, `color`, `text_color`) are set independently so a day can
/// carry both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMarking {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dot_color: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub starting_day: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ending_day: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

impl DayMarking {
    pub fn set_dot(&mut self, color: &str) {
        self.marked = Some(true);
        self.dot_color = Some(color.to_string());
    }

    pub fn set_range(&mut self, background: &str, text: &str) {
        self.color = Some(background.to_string());
        self.text_color = Some(text.to_string());
    }

    pub fn has_dot(&self) -> bool {
        self.dot_color.is_some()
    }
}

/// Keyed by local `YYYY-MM-DD`. Ordered so serialized output is stable.
pub type CalendarMarking = BTreeMap<String, DayMarking>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkingPalette {
    pub active_dot: String,
    pub rest_dot: String,
    pub streak_background: String,
    pub streak_text: String,
    pub error: String,
}

impl Default for MarkingPalette {
    fn default() -> Self {
        Self {
            active_dot: "#4CAF50".into(),
            rest_dot: "#9E9E9E".into(),
            streak_background: "#FFB74D".into(),
            streak_text: "#FFFFFF".into(),
            error: "#F44336".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
