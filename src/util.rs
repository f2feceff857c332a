use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::auth::Session;
use crate::entities::{goal, task};
use crate::model::Priority;

const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, NAIVE_DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
        })
}

/// Calendar day of a stored timestamp, read in the timestamp's own offset.
pub fn timestamp_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    parse_naive(value).map(|dt| dt.date())
}

/// Milliseconds since the Unix epoch; naive timestamps are read as UTC.
pub fn timestamp_millis(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    parse_naive(value).map(|dt| dt.and_utc().timestamp_millis())
}

pub fn day_start_timestamp(day: NaiveDate) -> String {
    day.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Short account date, `YYYY.MM.DD`, or `-` when missing or unparseable.
pub fn format_account_date(value: Option<&str>) -> String {
    value
        .and_then(timestamp_day)
        .map(|day| day.format("%Y.%m.%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_task_line(task: &task::Model) -> String {
    let mark = if task.is_complete { "x" } else { " " };
    let priority = task
        .priority
        .as_deref()
        .and_then(Priority::parse)
        .unwrap_or(Priority::Medium);
    let mut line = format!(
        "{:<4} [{}] {:<6} {:<5} {}",
        task.id,
        mark,
        priority.as_str(),
        task.sort_order.unwrap_or(0),
        task.text
    );
    if task.status.as_deref() == Some("failed") {
        line.push_str(" (sync failed)");
    }
    line
}

pub fn format_goal_line(goal: &goal::Model) -> String {
    format!(
        "{:<4} {:<9} {:<5} {}",
        goal.id,
        goal.status.as_deref().unwrap_or("active"),
        goal.sort_order.unwrap_or(0),
        goal.title
    )
}

pub fn format_session(session: &Session) -> String {
    let mut output = String::new();
    output.push_str(&format!("User ID: {}\n", session.user_id));
    output.push_str(&format!(
        "Email: {}\n",
        session.email.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "Provider: {}\n",
        session.provider.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "Last sign-in: {}\n",
        format_account_date(session.last_sign_in_at.as_deref())
    ));
    output.push_str(&format!(
        "Joined: {}",
        format_account_date(session.created_at.as_deref())
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_day_ignores_time_of_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).expect("date");
        assert_eq!(timestamp_day("2024-03-10T00:00:00Z"), Some(day));
        assert_eq!(timestamp_day("2024-03-10T23:59:59.999Z"), Some(day));
        assert_eq!(timestamp_day("2024-03-10T23:30:00+09:00"), Some(day));
        assert_eq!(timestamp_day("2024-03-10T08:15:00"), Some(day));
        assert_eq!(timestamp_day("2024-03-10"), Some(day));
        assert_eq!(timestamp_day("not a date"), None);
    }

    #[test]
    fn timestamp_millis_reads_rfc3339() {
        assert_eq!(
            timestamp_millis("2024-01-01T00:00:00Z"),
            Some(1_704_067_200_000)
        );
        assert_eq!(timestamp_millis("2024-01-01"), Some(1_704_067_200_000));
        assert_eq!(timestamp_millis(""), None);
    }

    #[test]
    fn day_start_timestamp_round_trips_to_same_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).expect("date");
        let stamp = day_start_timestamp(day);
        assert_eq!(stamp, "2024-03-10T00:00:00.000Z");
        assert_eq!(timestamp_day(&stamp), Some(day));
    }

    #[test]
    fn account_date_falls_back_to_dash() {
        assert_eq!(
            format_account_date(Some("2024-05-06T10:00:00Z")),
            "2024.05.06"
        );
        assert_eq!(format_account_date(Some("garbage")), "-");
        assert_eq!(format_account_date(None), "-");
    }
}
