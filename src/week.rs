use chrono::{Datelike, Duration, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Half-open ISO week `[monday, next monday)` containing `date`.
pub fn week_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    (start, start + Duration::days(7))
}

pub fn contains(range: (NaiveDate, NaiveDate), date: NaiveDate) -> bool {
    range.0 <= date && date < range.1
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}
