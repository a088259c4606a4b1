//! iCalendar feed generation for calendar subscriptions.
//!
//! Times are written as wall-clock values paired with the calendar TZID so
//! subscribing clients apply daylight saving themselves.

use chrono::{DateTime, FixedOffset, Utc};

use crate::config::CalendarConfig;
use crate::error::{Result, SiteError};
use crate::events::{parse_event_time, Event};
use crate::format::non_empty;

/// Content lines longer than this are folded
const FOLD_WIDTH: usize = 74;

const ICS_DATE_TIME: &str = "%Y%m%dT%H%M%S";

/// Escapes TEXT values: backslash, `;`, `,` and line breaks
pub fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
        .replace('\r', "\\n")
}

/// Folds a content line into `FOLD_WIDTH`-character segments joined by
/// CRLF and a single leading space.
pub fn fold_line(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() <= FOLD_WIDTH {
        return line.to_string();
    }
    let mut segments: Vec<String> = vec![chars[..FOLD_WIDTH].iter().collect()];
    let mut rest: Vec<char> = std::iter::once(' ').chain(chars[FOLD_WIDTH..].iter().copied()).collect();
    while rest.len() > FOLD_WIDTH {
        segments.push(rest[..FOLD_WIDTH].iter().collect());
        rest = std::iter::once(' ').chain(rest[FOLD_WIDTH..].iter().copied()).collect();
    }
    segments.push(rest.into_iter().collect());
    segments.join("\r\n")
}

/// VTIMEZONE rules; only Australia/Sydney is known, other zones get none
pub fn vtimezone(tzid: &str) -> Vec<String> {
    if tzid != "Australia/Sydney" {
        return Vec::new();
    }
    [
        "BEGIN:VTIMEZONE",
        "TZID:Australia/Sydney",
        "X-LIC-LOCATION:Australia/Sydney",
        "BEGIN:STANDARD",
        "TZOFFSETFROM:+1100",
        "TZOFFSETTO:+1000",
        "TZNAME:AEST",
        "DTSTART:19700405T030000",
        "RRULE:FREQ=YEARLY;BYMONTH=4;BYDAY=1SU",
        "END:STANDARD",
        "BEGIN:DAYLIGHT",
        "TZOFFSETFROM:+1000",
        "TZOFFSETTO:+1100",
        "TZNAME:AEDT",
        "DTSTART:19701004T020000",
        "RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=1SU",
        "END:DAYLIGHT",
        "END:VTIMEZONE",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn local_time(event: &Event, value: Option<&str>, field: &str, offset: FixedOffset) -> Result<String> {
    let value = value.ok_or_else(|| {
        SiteError::InvalidEvent(format!("'{}' is missing {}", event.display_title(), field))
    })?;
    let time: DateTime<FixedOffset> = parse_event_time(value, offset).ok_or_else(|| {
        SiteError::InvalidEvent(format!("'{}' has an invalid {}: {}", event.display_title(), field, value))
    })?;
    Ok(time.format(ICS_DATE_TIME).to_string())
}

fn description(event: &Event) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(description) = non_empty(&event.description) {
        parts.push(description.to_string());
    }
    if let Some(activity) = non_empty(&event.meeting_activity) {
        if activity != event.display_title() {
            parts.push(format!("Activity: {}", activity));
        }
    }
    if let Some(mini) = non_empty(&event.mini_competition) {
        parts.push(format!("Mini competition: {}", mini));
    }
    if let Some(comments) = non_empty(&event.comments) {
        parts.push(format!("Notes: {}", comments));
    }
    escape_text(&parts.join("\n"))
}

/// One VEVENT; errors when the event has no usable start or end
pub fn vevent(
    event: &Event,
    config: &CalendarConfig,
    offset: FixedOffset,
    dtstamp: &DateTime<Utc>,
) -> Result<Vec<String>> {
    let dtstart = local_time(event, Some(event.start.trim()).filter(|s| !s.is_empty()), "start", offset)?;
    let dtend = local_time(event, non_empty(&event.end), "end", offset)?;
    let uid_base = non_empty(&event.id)
        .map(str::to_string)
        .unwrap_or_else(|| event.title.trim().to_string());

    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}@{}", uid_base, config.uid_domain),
        format!("DTSTAMP:{}Z", dtstamp.format(ICS_DATE_TIME)),
        format!("DTSTART;TZID={}:{}", config.tzid, dtstart),
        format!("DTEND;TZID={}:{}", config.tzid, dtend),
        format!("SUMMARY:{}", escape_text(event.display_title())),
    ];
    let location = non_empty(&event.location).unwrap_or(config.default_location.as_str());
    if !location.is_empty() {
        lines.push(format!("LOCATION:{}", escape_text(location)));
    }
    let description = description(event);
    if !description.is_empty() {
        lines.push(format!("DESCRIPTION:{}", description));
    }
    lines.push("END:VEVENT".to_string());
    Ok(lines)
}

/// Builds the full calendar document with CRLF line endings.
pub fn generate_ics(
    events: &[Event],
    config: &CalendarConfig,
    offset: FixedOffset,
    dtstamp: DateTime<Utc>,
) -> Result<String> {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", config.prodid),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{}", escape_text(&config.name)),
        format!("X-WR-CALDESC:{}", escape_text(&config.description)),
        format!("X-WR-TIMEZONE:{}", config.tzid),
    ];
    lines.extend(vtimezone(&config.tzid));
    for event in events {
        lines.extend(vevent(event, config, offset, &dtstamp)?);
    }
    lines.push("END:VCALENDAR".to_string());

    tracing::debug!(events = events.len(), "generated calendar feed");
    let folded: Vec<String> = lines.iter().map(|line| fold_line(line)).collect();
    Ok(folded.join("\r\n") + "\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sydney() -> FixedOffset {
        FixedOffset::east_opt(10 * 3600).unwrap()
    }

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn meeting() -> Event {
        Event {
            id: Some("20250206-feb-meeting".to_string()),
            title: "February Meeting".to_string(),
            start: "2025-02-06T19:30:00+11:00".to_string(),
            end: Some("2025-02-06T21:30:00+11:00".to_string()),
            meeting_activity: Some("Cider tasting".to_string()),
            comments: Some("Bring glasses, notes; pens".to_string()),
            ..Event::default()
        }
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a,b;c\\d\ne"), "a\\,b\\;c\\\\d\\ne");
    }

    #[test]
    fn test_fold_line() {
        let line = "X".repeat(160);
        let folded = fold_line(&line);
        let parts: Vec<&str> = folded.split("\r\n").collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 74);
        assert_eq!(parts[1].len(), 74);
        assert!(parts[1].starts_with(' '));
        assert_eq!(parts[2], format!(" {}", "X".repeat(13)));
        assert_eq!(fold_line("SHORT"), "SHORT");
    }

    #[test]
    fn test_generate_ics() {
        let ics = generate_ics(&[meeting()], &CalendarConfig::default(), sydney(), stamp()).unwrap();
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert!(ics.contains("BEGIN:VTIMEZONE\r\nTZID:Australia/Sydney\r\n"));
        assert!(ics.contains("UID:20250206-feb-meeting@sydneyawc.com\r\n"));
        assert!(ics.contains("DTSTAMP:20250102T030405Z\r\n"));
        assert!(ics.contains("DTSTART;TZID=Australia/Sydney:20250206T193000\r\n"));
        assert!(ics.contains("DTEND;TZID=Australia/Sydney:20250206T213000\r\n"));
        assert!(ics.contains("LOCATION:Club Rivers\\, 32 Littleton St\\, Riverwood NSW 2210\r\n"));
        assert!(ics.contains("DESCRIPTION:Activity: Cider tasting\\nNotes: Bring glasses\\, notes\\; pens"));
    }

    #[test]
    fn test_activity_matching_title_is_omitted() {
        let event = Event {
            title: String::new(),
            meeting_activity: Some("Cider tasting".to_string()),
            comments: None,
            ..meeting()
        };
        let lines = vevent(&event, &CalendarConfig::default(), sydney(), &stamp()).unwrap();
        assert!(lines.contains(&"SUMMARY:Cider tasting".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("DESCRIPTION")));
    }

    #[test]
    fn test_missing_end_is_an_error() {
        let event = Event { end: None, ..meeting() };
        let err = generate_ics(&[event], &CalendarConfig::default(), sydney(), stamp()).unwrap_err();
        assert!(matches!(err, SiteError::InvalidEvent(_)));
    }

    #[test]
    fn test_other_zones_have_no_vtimezone() {
        assert!(vtimezone("UTC").is_empty());
    }
}
