use std::cmp::Ordering;

use chrono::{DateTime, Datelike, FixedOffset};
use serde_json::Value;

/// First show year, used to number shows that don't carry an edition
pub const FIRST_SHOW_YEAR: i32 = 1975;

/// Placeholder for an absent value in tables
pub const EMPTY_VALUE: &str = "—";

// ============================================================================
// ORDINALS
// ============================================================================

/// English ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st ...
pub fn ordinal_suffix(n: i64) -> &'static str {
    let rem10 = n.rem_euclid(10);
    let rem100 = n.rem_euclid(100);
    match (rem10, rem100) {
        (1, r) if r != 11 => "st",
        (2, r) if r != 12 => "nd",
        (3, r) if r != 13 => "rd",
        _ => "th",
    }
}

pub fn ordinal(n: i64) -> String {
    format!("{}{}", n, ordinal_suffix(n))
}

// ============================================================================
// SCORES
// ============================================================================

/// Whole scores print without decimals, everything else with one.
pub fn format_score(score: Option<f64>) -> String {
    match score {
        None => EMPTY_VALUE.to_string(),
        Some(value) if value.fract() == 0.0 => format!("{:.0}", value),
        Some(value) => format!("{:.1}", value),
    }
}

/// Score formatting for loosely typed template values
pub fn format_score_value(value: &Value) -> String {
    match value {
        Value::Null => EMPTY_VALUE.to_string(),
        Value::Number(n) => format_score(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => EMPTY_VALUE.to_string(),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => format_score(Some(n)),
            _ => s.clone(),
        },
        other => other.to_string(),
    }
}

// ============================================================================
// DATES
// ============================================================================

/// "7:30 PM"
pub fn format_time(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%-I:%M %p").to_string()
}

/// "Thu 2 Oct 2025"
pub fn format_short_date(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%a %-d %b %Y").to_string()
}

/// "October 2025"
pub fn format_month_label(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%B %Y").to_string()
}

/// "7:30 PM Thursday 2nd October 2025"
pub fn format_meeting_line(dt: &DateTime<FixedOffset>) -> String {
    format!(
        "{} {} {} {} {}",
        format_time(dt),
        dt.format("%A"),
        ordinal(i64::from(dt.day())),
        dt.format("%B"),
        dt.year()
    )
}

// ============================================================================
// STRINGS
// ============================================================================

/// Treats empty and whitespace-only strings as absent
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Case-insensitive comparison where digit runs compare by numeric value,
/// so "2" < "10" and "A9" < "a10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_chunks(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    let x_digits = x.starts_with(|c: char| c.is_ascii_digit());
    let y_digits = y.starts_with(|c: char| c.is_ascii_digit());
    if x_digits && y_digits {
        let xs = x.trim_start_matches('0');
        let ys = y.trim_start_matches('0');
        return xs.len().cmp(&ys.len()).then_with(|| xs.cmp(ys));
    }
    x.to_lowercase().cmp(&y.to_lowercase())
}

/// Splits a string into alternating digit and non-digit runs
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Chunks { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}

// ============================================================================
// SHOW EDITIONS
// ============================================================================

/// Show number counted from the first show year, never below 1st
pub fn ordinal_show_number(year: i32) -> String {
    let number = (year - FIRST_SHOW_YEAR + 1).max(1);
    ordinal(i64::from(number))
}

/// Leading ordinal of an edition name, e.g. "50th" from "50th Annual Wine Show"
pub fn extract_ordinal(edition: &str) -> Option<String> {
    let edition = edition.trim();
    let digits = edition.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let suffix: String = edition[digits..].chars().take(2).collect();
    let lower = suffix.to_lowercase();
    if matches!(lower.as_str(), "st" | "nd" | "rd" | "th") {
        Some(format!("{}{}", &edition[..digits], suffix))
    } else {
        None
    }
}

/// Full edition label for titles
pub fn edition_label(edition: Option<&str>, edition_number: Option<i64>, year: i32) -> String {
    if let Some(edition) = edition.filter(|e| !e.trim().is_empty()) {
        return edition.to_string();
    }
    match edition_number {
        Some(number) => format!("{} Annual Wine Show", ordinal(number)),
        None => format!("{} Annual Wine Show", ordinal_show_number(year)),
    }
}

/// Short edition ordinal for the subtitle
pub fn edition_display(edition: Option<&str>, edition_number: Option<i64>, year: i32) -> String {
    if let Some(number) = edition_number {
        return ordinal(number);
    }
    edition
        .and_then(extract_ordinal)
        .unwrap_or_else(|| ordinal_show_number(year))
}
