//! Local-time day and week boundaries.
//!
//! Every function takes the viewer's timezone explicitly so that bucketing
//! never depends on the server clock's zone. Weeks start on Monday. Profiles
//! carry IANA zones, so local midnight can be skipped or repeated around a
//! DST change.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Longest stretch of non-existent local time we walk across when a
/// midnight falls inside a DST gap.
const GAP_PROBE_MINUTES: i64 = 180;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

pub type DateResult<T> = Result<T, DateError>;

/// Parses an RFC 3339 timestamp (`2024-06-03T07:30:00+02:00`) into a UTC instant.
pub fn parse_instant(raw: &str) -> DateResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DateError::InvalidDate(format!("{raw:?} is not an RFC 3339 timestamp ({e})")))
}

pub fn local_date<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// `YYYY-MM-DD` key used for day bucketing and calendar markings.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn to_local_date_key<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> String {
    date_key(local_date(instant, tz))
}

/// The Monday on or before `date`.
pub fn week_monday(date: NaiveDate) -> DateResult<NaiveDate> {
    let back = i64::from(date.weekday().num_days_from_monday());
    shift_days(date, -back)
}

/// The Sunday on or after `date`.
pub fn week_sunday(date: NaiveDate) -> DateResult<NaiveDate> {
    shift_days(week_monday(date)?, 6)
}

pub fn start_of_day<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> DateResult<DateTime<Utc>> {
    local_midnight(local_date(instant, tz), tz)
}

/// 23:59:59.999 local time on the instant's day.
pub fn end_of_day<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> DateResult<DateTime<Utc>> {
    let next = shift_days(local_date(instant, tz), 1)?;
    Ok(local_midnight(next, tz)? - Duration::milliseconds(1))
}

pub fn start_of_week<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> DateResult<DateTime<Utc>> {
    local_midnight(week_monday(local_date(instant, tz))?, tz)
}

/// Sunday 23:59:59.999 local time of the instant's week.
pub fn end_of_week<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> DateResult<DateTime<Utc>> {
    let next_monday = shift_days(week_monday(local_date(instant, tz))?, 7)?;
    Ok(local_midnight(next_monday, tz)? - Duration::milliseconds(1))
}

/// A Monday-to-Sunday week in local time, carried as UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub monday: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    pub fn containing<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> DateResult<Self> {
        Ok(Self {
            monday: week_monday(local_date(instant, tz))?,
            start: start_of_week(instant, tz)?,
            end: end_of_week(instant, tz)?,
        })
    }

    pub fn starting<Tz: TimeZone>(monday: NaiveDate, tz: &Tz) -> DateResult<Self> {
        let monday = week_monday(monday)?;
        let next_monday = shift_days(monday, 7)?;
        Ok(Self {
            monday,
            start: local_midnight(monday, tz)?,
            end: local_midnight(next_monday, tz)? - Duration::milliseconds(1),
        })
    }

    pub fn previous<Tz: TimeZone>(&self, tz: &Tz) -> DateResult<Self> {
        Self::starting(shift_days(self.monday, -7)?, tz)
    }

    pub fn sunday(&self) -> NaiveDate {
        self.monday + Duration::days(6)
    }

    /// Inclusive on both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn shift_days(date: NaiveDate, days: i64) -> DateResult<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| DateError::InvalidDate(format!("{date} shifted by {days} days is out of range")))
}

fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateResult<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DateError::InvalidDate(format!("no midnight for {date}")))?;
    resolve_local(midnight, tz)
}

/// Ambiguous wall-clock times resolve to the earlier instant; times inside a
/// gap move forward to the first minute that exists.
fn resolve_local<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> DateResult<DateTime<Utc>> {
    let mut probe = naive;
    for _ in 0..=GAP_PROBE_MINUTES {
        if let Some(resolved) = tz.from_local_datetime(&probe).earliest() {
            return Ok(resolved.with_timezone(&Utc));
        }
        probe = probe
            .checked_add_signed(Duration::minutes(1))
            .ok_or_else(|| DateError::InvalidDate(format!("{naive} is out of range")))?;
    }
    Err(DateError::InvalidDate(format!(
        "{naive} does not exist in the local timezone"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(raw: &str) -> DateTime<Utc> {
        parse_instant(raw).unwrap()
    }

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    #[test]
    fn test_date_key_uses_local_offset() {
        let instant = utc("2024-06-02T23:30:00Z");
        assert_eq!(to_local_date_key(instant, &Utc), "2024-06-02");
        assert_eq!(to_local_date_key(instant, &offset(2)), "2024-06-03");
        assert_eq!(to_local_date_key(instant, &offset(-5)), "2024-06-02");
        // Same input, same key.
        assert_eq!(
            to_local_date_key(instant, &offset(2)),
            to_local_date_key(instant, &offset(2))
        );
    }

    #[test]
    fn test_day_bounds() {
        let tz = offset(2);
        let instant = utc("2024-06-05T10:15:00Z");
        assert_eq!(start_of_day(instant, &tz).unwrap(), utc("2024-06-04T22:00:00Z"));
        assert_eq!(
            end_of_day(instant, &tz).unwrap(),
            utc("2024-06-05T21:59:59.999Z")
        );
    }

    #[test]
    fn test_week_starts_on_monday() {
        // 2024-06-09 is a Sunday, 2024-06-03 the Monday before it.
        let sunday_evening = utc("2024-06-09T20:00:00Z");
        assert_eq!(
            start_of_week(sunday_evening, &Utc).unwrap(),
            utc("2024-06-03T00:00:00Z")
        );
        assert_eq!(
            end_of_week(sunday_evening, &Utc).unwrap(),
            utc("2024-06-09T23:59:59.999Z")
        );

        let monday_midnight = utc("2024-06-10T00:00:00Z");
        assert_eq!(
            start_of_week(monday_midnight, &Utc).unwrap(),
            monday_midnight
        );
    }

    #[test]
    fn test_week_bucketing_follows_offset() {
        // Sunday night in New York is already Monday in UTC.
        let instant = utc("2024-06-10T02:00:00Z");
        let ny = offset(-4);
        let window = WeekWindow::containing(instant, &ny).unwrap();
        assert_eq!(window.monday, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(window.start, utc("2024-06-03T04:00:00Z"));
        assert_eq!(window.end, utc("2024-06-10T03:59:59.999Z"));
        assert!(window.contains(instant));
    }

    #[test]
    fn test_new_york_bucketing_tracks_daylight_saving() {
        let ny = chrono_tz::America::New_York;
        // Sunday 23:30 local in winter (EST) and in summer (EDT).
        let winter = utc("2024-01-08T04:30:00Z");
        let summer = utc("2024-06-10T03:30:00Z");

        assert_eq!(to_local_date_key(winter, &ny), "2024-01-07");
        assert_eq!(to_local_date_key(summer, &ny), "2024-06-09");
        assert_eq!(
            WeekWindow::containing(winter, &ny).unwrap().monday,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(
            WeekWindow::containing(summer, &ny).unwrap().monday,
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
        );
    }

    #[test]
    fn test_midnight_in_spring_forward_gap() {
        // Havana skips 00:00-01:00 on 2024-03-10; the day starts at 01:00 CDT.
        let havana = chrono_tz::America::Havana;
        let noon = utc("2024-03-10T16:00:00Z");
        assert_eq!(start_of_day(noon, &havana).unwrap(), utc("2024-03-10T05:00:00Z"));
        assert_eq!(
            end_of_day(utc("2024-03-09T16:00:00Z"), &havana).unwrap(),
            utc("2024-03-10T04:59:59.999Z")
        );
    }

    #[test]
    fn test_midnight_in_fall_back_overlap() {
        // Havana repeats 00:00-01:00 on 2024-11-03; the earlier midnight wins.
        let havana = chrono_tz::America::Havana;
        let noon = utc("2024-11-03T17:00:00Z");
        assert_eq!(start_of_day(noon, &havana).unwrap(), utc("2024-11-03T04:00:00Z"));
        assert_eq!(
            end_of_day(utc("2024-11-02T16:00:00Z"), &havana).unwrap(),
            utc("2024-11-03T03:59:59.999Z")
        );
        // A week spanning the change is still contiguous.
        let window = WeekWindow::containing(noon, &havana).unwrap();
        assert_eq!(window.monday, NaiveDate::from_ymd_opt(2024, 10, 28).unwrap());
        assert_eq!(
            window.previous(&havana).unwrap().end + Duration::milliseconds(1),
            window.start
        );
    }

    #[test]
    fn test_week_sunday() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        assert_eq!(week_sunday(wednesday).unwrap(), sunday);
        assert_eq!(week_sunday(sunday).unwrap(), sunday);
    }

    #[test]
    fn test_previous_week_window() {
        let window = WeekWindow::containing(utc("2024-06-12T12:00:00Z"), &Utc).unwrap();
        let previous = window.previous(&Utc).unwrap();
        assert_eq!(previous.monday, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(previous.sunday(), NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());
        assert_eq!(previous.end + Duration::milliseconds(1), window.start);
        assert!(!previous.contains(window.start));
    }

    #[test]
    fn test_starting_normalizes_to_monday() {
        let thursday = NaiveDate::from_ymd_opt(2024, 6, 6).unwrap();
        let window = WeekWindow::starting(thursday, &Utc).unwrap();
        assert_eq!(window.monday, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
    }

    #[test]
    fn test_parse_instant_rejects_garbage() {
        assert!(matches!(
            parse_instant("yesterday"),
            Err(DateError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_instant("2024-02-30T10:00:00Z"),
            Err(DateError::InvalidDate(_))
        ));
        assert_eq!(
            parse_instant("2024-06-03T07:30:00+02:00").unwrap(),
            utc("2024-06-03T05:30:00Z")
        );
    }
}
