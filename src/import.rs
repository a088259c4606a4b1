//! Converts a cleaned activities spreadsheet (CSV) into events.json records.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};

use crate::error::{Result, SiteError};
use crate::events::Event;

/// Meeting hours used when a row has no start or end time
pub const DEFAULT_START: (u32, u32) = (19, 30);
pub const DEFAULT_END: (u32, u32) = (21, 30);

/// Longest slug kept in deterministic ids
const SLUG_LIMIT: usize = 60;

/// Header aliases per field, compared lowercased and trimmed
const DATE_ALIASES: &[&str] = &["date", "meeting date", "event date"];
const START_ALIASES: &[&str] = &["start", "start time", "time", "starttime"];
const END_ALIASES: &[&str] = &["end", "end time", "finish", "finishtime"];
const TITLE_ALIASES: &[&str] = &["meeting activity", "title", "event", "activity", "name"];
const ACTIVITY_ALIASES: &[&str] = &["meeting activity", "activity details", "program"];
const MINI_ALIASES: &[&str] = &["mini competition", "mini-comp", "minicompetition", "mini comp"];
const COMMENT_ALIASES: &[&str] = &["comments", "comment", "notes to members"];
const LOCATION_ALIASES: &[&str] = &["location", "venue", "address"];
const DESCRIPTION_ALIASES: &[&str] = &["description", "desc", "details", "notes"];

const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%d %B %Y", "%d %b %Y", "%A %d %B %Y",
    "%a %d %b %Y", "%A, %d %B %Y",
];

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p", "%I %p", "%I%p"];

/// How event ids are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IdMode {
    /// Random v4 UUID per event
    #[default]
    Uuid,
    /// `YYYYMMDD-title-slug`, stable across runs
    Deterministic,
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub id_mode: IdMode,
    pub offset: FixedOffset,
}

/// Column positions resolved from the header row
#[derive(Debug, Default)]
struct Columns {
    date: Option<usize>,
    start: Option<usize>,
    end: Option<usize>,
    title: Option<usize>,
    activity: Option<usize>,
    mini: Option<usize>,
    comments: Option<usize>,
    location: Option<usize>,
    description: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|header| aliases.contains(&header.trim().to_lowercase().as_str()))
        };
        Columns {
            date: find(DATE_ALIASES),
            start: find(START_ALIASES),
            end: find(END_ALIASES),
            title: find(TITLE_ALIASES).or_else(|| find(ACTIVITY_ALIASES)),
            activity: find(ACTIVITY_ALIASES),
            mini: find(MINI_ALIASES),
            comments: find(COMMENT_ALIASES),
            location: find(LOCATION_ALIASES),
            description: find(DESCRIPTION_ALIASES),
        }
    }
}

fn cell(record: &csv::StringRecord, column: Option<usize>) -> &str {
    column.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

// ============================================================================
// FIELD PARSING
// ============================================================================

/// Day-first calendar date, e.g. "6/2/2025" is 6 February
pub fn parse_day_first_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    // spreadsheet exports often append a midnight time
    let date_part = value.split_once(' ').map_or(value, |(date, rest)| {
        if rest.contains(':') && !date.is_empty() { date } else { value }
    });
    DATE_FORMATS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(date_part, pattern).ok())
}

/// "19:30", "7:30 PM", "7pm", or a spreadsheet day fraction such as 0.8125
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(fraction) = value.parse::<f64>() {
        if (0.0..2.0).contains(&fraction) {
            let minutes = (fraction * 24.0 * 60.0).round() as u32;
            return NaiveTime::from_hms_opt((minutes / 60) % 24, minutes % 60, 0);
        }
        return None;
    }
    let upper = value.to_uppercase();
    TIME_FORMATS
        .iter()
        .find_map(|pattern| NaiveTime::parse_from_str(&upper, pattern).ok())
}

/// Lowercase, punctuation dropped, whitespace/underscore/hyphen runs as one hyphen
pub fn slugify(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();
    let mut slug = String::new();
    let mut pending_hyphen = false;
    for c in cleaned.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            pending_hyphen = true;
            continue;
        }
        if pending_hyphen && !slug.is_empty() {
            slug.push('-');
        }
        pending_hyphen = false;
        slug.push(c);
    }
    slug
}

pub fn make_id(title: &str, start: &DateTime<FixedOffset>, mode: IdMode) -> String {
    match mode {
        IdMode::Uuid => uuid::Uuid::new_v4().to_string(),
        IdMode::Deterministic => {
            let slug: String = slugify(title).chars().take(SLUG_LIMIT).collect();
            format!("{}-{}", start.format("%Y%m%d"), slug.trim_end_matches('-'))
        }
    }
}

fn at(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    offset.from_local_datetime(&date.and_time(time)).single()
}

fn default_time((hour, minute): (u32, u32)) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
}

// ============================================================================
// IMPORT
// ============================================================================

/// Reads every usable row. Rows without a title or a parseable date are
/// skipped; output is sorted by start.
pub fn import_events<R: Read>(reader: R, options: &ImportOptions) -> Result<Vec<Event>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let columns = Columns::resolve(&headers);

    let mut missing = Vec::new();
    if columns.date.is_none() {
        missing.push("date");
    }
    if columns.title.is_none() {
        missing.push("title");
    }
    if !missing.is_empty() {
        let present: Vec<&str> = headers.iter().collect();
        return Err(SiteError::MissingColumn(format!(
            "{} (columns present: {})",
            missing.join(", "),
            present.join(", ")
        )));
    }

    let mut timed: Vec<(DateTime<FixedOffset>, Event)> = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let title = cell(&record, columns.title);
        if title.is_empty() {
            continue;
        }
        let Some(date) = parse_day_first_date(cell(&record, columns.date)) else {
            tracing::warn!(row = row + 2, title, "skipping row with unparseable date");
            continue;
        };

        let start_time = parse_clock_time(cell(&record, columns.start)).or_else(|| default_time(DEFAULT_START));
        let end_time = parse_clock_time(cell(&record, columns.end));
        let Some(start) = start_time.and_then(|time| at(date, time, options.offset)) else {
            continue;
        };
        let end = match end_time {
            Some(time) => at(date, time, options.offset).map(|end| {
                if end <= start { end + Duration::days(1) } else { end }
            }),
            None => default_time(DEFAULT_END).and_then(|time| at(date, time, options.offset)),
        };
        let Some(end) = end else { continue };

        let event = Event {
            id: Some(make_id(title, &start, options.id_mode)),
            title: title.to_string(),
            start: start.to_rfc3339(),
            end: Some(end.to_rfc3339()),
            location: optional(cell(&record, columns.location)),
            description: optional(cell(&record, columns.description)),
            meeting_activity: optional(cell(&record, columns.activity)),
            mini_competition: optional(cell(&record, columns.mini)),
            comments: optional(cell(&record, columns.comments)),
        };
        timed.push((start, event));
    }

    timed.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::info!(events = timed.len(), "imported calendar rows");
    Ok(timed.into_iter().map(|(_, event)| event).collect())
}

pub fn import_events_from_path(path: &Path, options: &ImportOptions) -> Result<Vec<Event>> {
    let file = std::fs::File::open(path)?;
    import_events(file, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn options(id_mode: IdMode) -> ImportOptions {
        ImportOptions {
            id_mode,
            offset: FixedOffset::east_opt(11 * 3600).unwrap(),
        }
    }

    #[test]
    fn test_parse_day_first_date() {
        assert_eq!(parse_day_first_date("6/2/2025"), NaiveDate::from_ymd_opt(2025, 2, 6));
        assert_eq!(parse_day_first_date("6/2/25"), NaiveDate::from_ymd_opt(2025, 2, 6));
        assert_eq!(parse_day_first_date("06-02-2025"), NaiveDate::from_ymd_opt(2025, 2, 6));
        assert_eq!(parse_day_first_date("2025-02-06"), NaiveDate::from_ymd_opt(2025, 2, 6));
        assert_eq!(parse_day_first_date("6 February 2025"), NaiveDate::from_ymd_opt(2025, 2, 6));
        assert_eq!(parse_day_first_date("6/2/2025 0:00"), NaiveDate::from_ymd_opt(2025, 2, 6));
        assert_eq!(parse_day_first_date("TBC"), None);
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("19:30"), NaiveTime::from_hms_opt(19, 30, 0));
        assert_eq!(parse_clock_time("7:30 pm"), NaiveTime::from_hms_opt(19, 30, 0));
        assert_eq!(parse_clock_time("0.8125"), NaiveTime::from_hms_opt(19, 30, 0));
        assert_eq!(parse_clock_time(""), None);
        assert_eq!(parse_clock_time("late"), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Cider & Perry Night! "), "cider-perry-night");
        assert_eq!(slugify("AGM -- 2025_review"), "agm-2025-review");
    }

    #[test]
    fn test_import_rows() {
        let csv = "\
Date,Start,End,Meeting Activity,Mini Competition,Comments
13/3/2025,,,Fruit wine tasting,Best rosé,
6/2/2025,7:00 PM,12:30 AM,Cider Night,,Bring a plate
,19:30,21:30,No date,,
1/1/2025,19:30,21:30,,,
";
        let events = import_events(csv.as_bytes(), &options(IdMode::Deterministic)).unwrap();
        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.id.as_deref(), Some("20250206-cider-night"));
        assert_eq!(first.title, "Cider Night");
        assert_eq!(first.start, "2025-02-06T19:00:00+11:00");
        assert_eq!(first.end.as_deref(), Some("2025-02-07T00:30:00+11:00"));
        assert_eq!(first.meeting_activity.as_deref(), Some("Cider Night"));
        assert_eq!(first.comments.as_deref(), Some("Bring a plate"));
        assert_eq!(first.mini_competition, None);

        let second = &events[1];
        assert_eq!(second.start, "2025-03-13T19:30:00+11:00");
        assert_eq!(second.end.as_deref(), Some("2025-03-13T21:30:00+11:00"));
        assert_eq!(second.mini_competition.as_deref(), Some("Best rosé"));
    }

    #[test]
    fn test_uuid_ids() {
        let csv = "date,title\n1/5/2025,Bottling day\n";
        let events = import_events(csv.as_bytes(), &options(IdMode::Uuid)).unwrap();
        let id = events[0].id.as_deref().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        let start = DateTime::parse_from_rfc3339(&events[0].start).unwrap();
        assert_eq!(start.hour(), 19);
    }

    #[test]
    fn test_missing_columns() {
        let csv = "when,what\n1/5/2025,Bottling day\n";
        let err = import_events(csv.as_bytes(), &options(IdMode::Uuid)).unwrap_err();
        assert!(matches!(err, SiteError::MissingColumn(ref msg) if msg.contains("date, title")));
    }
}
