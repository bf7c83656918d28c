//! Date formatting helpers shared by the menu, promotions, purchase history
//! and events editor.
//!
//! Textual forms:
//! - display: `dd/mm/yyyy` (what the admin API accepts),
//! - input: `yyyy-mm-dd` (HTML date controls, ISO dates from the API),
//! - day/month: `dd.mm` plus a three-letter month code,
//! - timestamp: `dd.mm.yyyy HH:mm`.
//!
//! Nothing in here panics or returns an error. Unparseable or empty input
//! yields `None`, an empty string, or `DayMonth::default()`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};

/// Month codes shown on event cards, January first.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "ЯНВ", "ФЕВ", "МАР", "АПР", "МАЙ", "ИЮН", "ИЮЛ", "АВГ", "СЕН", "ОКТ", "НОЯ", "ДЕК",
];

const DISPLAY_FORMAT: &str = "%d/%m/%Y";
const INPUT_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

const NAIVE_TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// `dd.mm` together with the month code, e.g. `15.12` / `ДЕК`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayMonth {
    pub day_month: String,
    pub month: String,
}

impl DayMonth {
    pub fn is_empty(&self) -> bool {
        self.day_month.is_empty() && self.month.is_empty()
    }
}

/// Splits `s` on `sep` into exactly three all-digit parts of the given widths.
fn numeric_parts(s: &str, sep: char, widths: [usize; 3]) -> Option<[u32; 3]> {
    let parts: Vec<&str> = s.trim().split(sep).collect();
    if parts.len() != 3 {
        return None;
    }

    let mut out = [0u32; 3];
    for (i, part) in parts.iter().enumerate() {
        if part.len() != widths[i] || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        out[i] = part.parse().ok()?;
    }
    Some(out)
}

/// Parses `dd/mm/yyyy`. Requires zero-padded fields and a real calendar date.
pub fn parse_display(s: &str) -> Option<NaiveDate> {
    let [day, month, year] = numeric_parts(s, '/', [2, 2, 4])?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

pub fn format_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

/// Parses `yyyy-mm-dd`.
pub fn parse_input(s: &str) -> Option<NaiveDate> {
    let [year, month, day] = numeric_parts(s, '-', [4, 2, 2])?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

pub fn format_input(date: NaiveDate) -> String {
    date.format(INPUT_FORMAT).to_string()
}

/// `dd/mm/yyyy` -> `yyyy-mm-dd`, or an empty string.
pub fn display_to_input(s: &str) -> String {
    parse_display(s).map(format_input).unwrap_or_default()
}

/// `yyyy-mm-dd` -> `dd/mm/yyyy`, or an empty string.
pub fn input_to_display(s: &str) -> String {
    parse_input(s).map(format_display).unwrap_or_default()
}

/// Accepts any date shape the API is known to send: display form, input form,
/// or a timestamp whose date part is in input form.
pub fn parse_any_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    parse_display(s)
        .or_else(|| parse_input(s))
        .or_else(|| parse_timestamp(s).map(|dt| dt.date()))
        .or_else(|| s.get(..10).and_then(parse_input))
}

/// Three-letter month code for a 1-based month number; empty when out of range.
pub fn month_abbreviation(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_ABBREVIATIONS.get(i as usize))
        .copied()
        .unwrap_or("")
}

pub fn month_label(date: NaiveDate) -> &'static str {
    month_abbreviation(date.month())
}

pub fn day_month(date: NaiveDate) -> DayMonth {
    DayMonth {
        day_month: date.format("%d.%m").to_string(),
        month: month_label(date).to_string(),
    }
}

/// Day/month label for a textual date in any supported shape.
pub fn format_day_month(s: &str) -> DayMonth {
    parse_any_date(s).map(day_month).unwrap_or_default()
}

/// Parses a timestamp keeping the wall-clock time it was written in.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// `dd.mm.yyyy HH:mm` for an RFC 3339 or `yyyy-mm-dd HH:MM[:SS]` timestamp.
///
/// RFC 3339 values are rendered in their own offset.
pub fn format_timestamp(s: &str) -> String {
    parse_timestamp(s)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parses `HH:MM` (seconds tolerated).
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
