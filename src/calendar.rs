use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, Timelike, Weekday};

use crate::prefs::WeekStart;

pub type Week = [Option<u32>; 7];

const MAX_WEEKS: usize = 6;

/// Month grid with blank leading cells so that column 0 is the week start.
/// Rows stop after the one holding the last day of the month.
pub fn month_grid(year: i32, month: u32, week_start: WeekStart) -> Option<Vec<Week>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = days_in_month(first)?;
    let raw = first.weekday().num_days_from_sunday();
    let offset = match week_start {
        WeekStart::Sunday => raw,
        WeekStart::Monday => (raw + 6) % 7,
    } as usize;

    let mut grid = Vec::with_capacity(MAX_WEEKS);
    let mut day = 1u32;
    for row in 0..MAX_WEEKS {
        let mut week: Week = [None; 7];
        for (col, cell) in week.iter_mut().enumerate() {
            if (row == 0 && col < offset) || day > days {
                continue;
            }
            *cell = Some(day);
            day += 1;
        }
        grid.push(week);
        if day > days {
            break;
        }
    }
    Some(grid)
}

pub fn weekday_order(week_start: WeekStart) -> [Weekday; 7] {
    let first = match week_start {
        WeekStart::Sunday => Weekday::Sun,
        WeekStart::Monday => Weekday::Mon,
    };
    let mut order = [first; 7];
    for idx in 1..7 {
        order[idx] = order[idx - 1].succ();
    }
    order
}

fn days_in_month(first: NaiveDate) -> Option<u32> {
    let next = first.checked_add_months(Months::new(1))?;
    Some(next.pred_opt()?.day())
}

/// Shifts a year/month pair by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> Option<(i32, u32)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let shifted = if delta >= 0 {
        first.checked_add_months(Months::new(delta as u32))?
    } else {
        first.checked_sub_months(Months::new(delta.unsigned_abs()))?
    };
    Some((shifted.year(), shifted.month()))
}

/// Reads a `YYYY-MM-DD` navigation value. Anything malformed, including
/// impossible dates such as `2024-02-31`, yields `None`.
pub fn parse_date_param(value: &str) -> Option<NaiveDate> {
    let mut parts = value.trim().split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn format_date_param(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Navigation target date: the parameter when it is valid, the current date otherwise.
pub fn resolve_date(param: Option<&str>, current: NaiveDate) -> NaiveDate {
    match param {
        Some(value) => parse_date_param(value).unwrap_or_else(|| {
            tracing::debug!(value, "ignoring malformed date parameter");
            current
        }),
        None => current,
    }
}

pub fn previous_day(day: NaiveDate) -> NaiveDate {
    day.checked_sub_days(Days::new(1)).unwrap_or(day)
}

pub fn next_day(day: NaiveDate) -> NaiveDate {
    day.checked_add_days(Days::new(1)).unwrap_or(day)
}

/// Share of the day elapsed at `now`, as a percentage clamped to 0..=100.
pub fn day_progress(now: NaiveDateTime) -> f64 {
    const DAY_SPAN_SECS: f64 = 86_399.0;
    let time = now.time();
    let elapsed = time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9;
    let percent = elapsed / DAY_SPAN_SECS * 100.0;
    percent.clamp(0.0, 100.0)
}
