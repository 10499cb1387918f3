//! Working-week helpers behind the weekly WFH bar chart.
use chrono::{Datelike, Duration, NaiveDate};

use crate::model::WfhCountByDate;

const WORKING_DAYS: i64 = 5;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Monday of the week containing `date`. Sunday belongs to the week that
/// started six days earlier.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let from_monday = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(from_monday)
}

pub fn previous_week(start: NaiveDate) -> NaiveDate {
    start - Duration::weeks(1)
}

pub fn next_week(start: NaiveDate) -> NaiveDate {
    start + Duration::weeks(1)
}

/// Monday..Friday starting at `start`, as ISO dates.
pub fn week_dates(start: NaiveDate) -> Vec<String> {
    (0..WORKING_DAYS)
        .map(|i| (start + Duration::days(i)).format(DATE_FORMAT).to_string())
        .collect()
}

/// Per-day WFH counts for the working week at `start`; absent days are 0.
pub fn wfh_series(counts: &WfhCountByDate, start: NaiveDate) -> Vec<(String, u32)> {
    week_dates(start)
        .into_iter()
        .map(|date| {
            let count = counts.get(&date).copied().unwrap_or(0);
            (date, count)
        })
        .collect()
}

/// Human label such as `Sep 16, 2024 - Sep 20, 2024`.
pub fn week_label(start: NaiveDate) -> String {
    let end = start + Duration::days(WORKING_DAYS - 1);
    format!("{} - {}", start.format("%b %-d, %Y"), end.format("%b %-d, %Y"))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}
