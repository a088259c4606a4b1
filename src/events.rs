use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::format::{format_month_label, non_empty};
use crate::lenient::{lenient_string, lenient_text};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A club calendar event as published in events.json. Nulls and numbers
/// in text fields degrade instead of failing the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(deserialize_with = "lenient_text")]
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub meeting_activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub mini_competition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub comments: Option<String>,
}

/// An event with its start and effective end resolved
#[derive(Debug, Clone)]
pub struct ScheduledEvent<'a> {
    pub event: &'a Event,
    pub start: DateTime<FixedOffset>,
    pub end: Option<DateTime<FixedOffset>>,
    pub effective_end: DateTime<FixedOffset>,
}

/// Events split around "now" for the calendar page
#[derive(Debug, Default)]
pub struct Schedule<'a> {
    /// Ascending by start
    pub upcoming: Vec<ScheduledEvent<'a>>,
    /// Most recent first
    pub past: Vec<ScheduledEvent<'a>>,
}

/// Upcoming events sharing a "Month Year" label, in schedule order
#[derive(Debug)]
pub struct MonthGroup<'a> {
    pub label: String,
    pub events: Vec<ScheduledEvent<'a>>,
}

// ============================================================================
// TIME PARSING
// ============================================================================

/// Parses RFC 3339, naive date-times and bare dates. Values without an
/// offset are placed in `default_offset`; bare dates start at midnight.
pub fn parse_event_time(value: &str, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return default_offset.from_local_datetime(&naive).single();
        }
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    default_offset.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

impl Event {
    pub fn start_time(&self, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        parse_event_time(&self.start, default_offset)
    }

    pub fn end_time(&self, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        non_empty(&self.end).and_then(|end| parse_event_time(end, default_offset))
    }

    /// The explicit end, or 23:59:59.999 of the start day in the start's offset.
    pub fn effective_end(&self, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        if let Some(end) = self.end_time(default_offset) {
            return Some(end);
        }
        let start = self.start_time(default_offset)?;
        let end_of_day = start.date_naive().and_hms_milli_opt(23, 59, 59, 999)?;
        start.offset().from_local_datetime(&end_of_day).single()
    }

    /// Resolves times; None when the start can't be parsed.
    pub fn schedule(&self, default_offset: FixedOffset) -> Option<ScheduledEvent<'_>> {
        let start = self.start_time(default_offset)?;
        let effective_end = self.effective_end(default_offset)?;
        Some(ScheduledEvent {
            event: self,
            start,
            end: self.end_time(default_offset),
            effective_end,
        })
    }

    /// Title shown for the event; falls back to the meeting activity
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if !title.is_empty() {
            return title;
        }
        non_empty(&self.meeting_activity).unwrap_or("Event")
    }
}

// ============================================================================
// SCHEDULING
// ============================================================================

/// Resolves all events with a parseable start, sorted ascending by start.
/// The sort is stable, so events sharing a start keep their input order.
pub fn scheduled(events: &[Event], default_offset: FixedOffset) -> Vec<ScheduledEvent<'_>> {
    let mut resolved: Vec<ScheduledEvent> = events
        .iter()
        .filter_map(|event| {
            let scheduled = event.schedule(default_offset);
            if scheduled.is_none() {
                tracing::warn!(title = %event.title, start = %event.start, "skipping event with unparseable start");
            }
            scheduled
        })
        .collect();
    resolved.sort_by(|a, b| a.start.cmp(&b.start));
    resolved
}

/// Earliest-starting event whose effective end is at or after `now`.
pub fn find_next_event<'a>(
    events: &'a [Event],
    now: DateTime<FixedOffset>,
    default_offset: FixedOffset,
) -> Option<ScheduledEvent<'a>> {
    scheduled(events, default_offset)
        .into_iter()
        .find(|e| e.effective_end >= now)
}

/// Splits events into upcoming (ascending) and past (most recent first).
pub fn split_schedule(
    events: &[Event],
    now: DateTime<FixedOffset>,
    default_offset: FixedOffset,
) -> Schedule<'_> {
    let (upcoming, mut past): (Vec<_>, Vec<_>) = scheduled(events, default_offset)
        .into_iter()
        .partition(|e| e.effective_end >= now);
    past.reverse();
    Schedule { upcoming, past }
}

/// Groups events by the month of their start, keeping first-seen order.
pub fn group_by_month<'a>(events: &[ScheduledEvent<'a>]) -> Vec<MonthGroup<'a>> {
    let mut groups: Vec<MonthGroup<'a>> = Vec::new();
    for event in events {
        let label = format_month_label(&event.start);
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.events.push(event.clone()),
            None => groups.push(MonthGroup {
                label,
                events: vec![event.clone()],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn sydney() -> FixedOffset {
        FixedOffset::east_opt(10 * 3600).unwrap()
    }

    fn event(title: &str, start: &str, end: Option<&str>) -> Event {
        Event {
            title: title.to_string(),
            start: start.to_string(),
            end: end.map(str::to_string),
            ..Event::default()
        }
    }

    #[test]
    fn test_parse_event_time_variants() {
        let offset = sydney();
        let with_offset = parse_event_time("2025-10-02T19:30:00+10:00", offset).unwrap();
        assert_eq!(with_offset.hour(), 19);

        let naive = parse_event_time("2025-10-02T19:30", offset).unwrap();
        assert_eq!(naive, with_offset);

        let date_only = parse_event_time("2025-10-02", offset).unwrap();
        assert_eq!(date_only.hour(), 0);

        assert!(parse_event_time("next thursday", offset).is_none());
        assert!(parse_event_time("  ", offset).is_none());
    }

    #[test]
    fn test_effective_end_defaults_to_end_of_day() {
        let e = event("Tasting", "2025-01-10T19:30:00+11:00", None);
        let end = e.effective_end(sydney()).unwrap();
        assert_eq!(end.to_rfc3339(), "2025-01-10T23:59:59.999+11:00");

        let explicit = event("Tasting", "2025-01-10T19:30:00+11:00", Some("2025-01-10T21:30:00+11:00"));
        assert_eq!(explicit.effective_end(sydney()).unwrap().hour(), 21);

        let blank_end = event("Tasting", "2025-01-10", Some(""));
        assert_eq!(blank_end.effective_end(sydney()).unwrap().hour(), 23);
    }

    #[test]
    fn test_find_next_event_skips_finished() {
        let events = vec![
            event("January", "2025-01-10", None),
            event("February", "2025-02-01", Some("2025-02-02")),
        ];
        let now = parse_event_time("2025-01-15", sydney()).unwrap();
        let next = find_next_event(&events, now, sydney()).unwrap();
        assert_eq!(next.event.title, "February");
    }

    #[test]
    fn test_find_next_event_includes_same_day() {
        let events = vec![event("Tonight", "2025-01-10T19:30:00+10:00", None)];
        let now = parse_event_time("2025-01-10T22:00:00+10:00", sydney()).unwrap();
        assert_eq!(find_next_event(&events, now, sydney()).unwrap().event.title, "Tonight");

        let later = parse_event_time("2025-01-11T00:00:00+10:00", sydney()).unwrap();
        assert!(find_next_event(&events, later, sydney()).is_none());
    }

    #[test]
    fn test_find_next_event_tie_keeps_input_order() {
        let events = vec![
            event("Later", "2025-03-01", None),
            event("First listed", "2025-02-01", None),
            event("Second listed", "2025-02-01", None),
        ];
        let now = parse_event_time("2025-01-01", sydney()).unwrap();
        assert_eq!(find_next_event(&events, now, sydney()).unwrap().event.title, "First listed");
    }

    #[test]
    fn test_split_schedule_orders() {
        let events = vec![
            event("C", "2025-03-01", None),
            event("A", "2025-01-01", None),
            event("B", "2025-02-01", None),
            event("D", "2025-04-01", None),
            event("Broken", "someday", None),
        ];
        let now = parse_event_time("2025-02-15", sydney()).unwrap();
        let schedule = split_schedule(&events, now, sydney());
        let upcoming: Vec<_> = schedule.upcoming.iter().map(|e| e.event.title.as_str()).collect();
        let past: Vec<_> = schedule.past.iter().map(|e| e.event.title.as_str()).collect();
        assert_eq!(upcoming, vec!["C", "D"]);
        assert_eq!(past, vec!["B", "A"]);
    }

    #[test]
    fn test_group_by_month() {
        let events = vec![
            event("A", "2025-03-05", None),
            event("B", "2025-03-20", None),
            event("C", "2025-04-02", None),
        ];
        let resolved = scheduled(&events, sydney());
        let groups = group_by_month(&resolved);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "March 2025");
        assert_eq!(groups[0].events.len(), 2);
        assert_eq!(groups[1].label, "April 2025");
    }

    #[test]
    fn test_display_title_fallback() {
        let mut e = event("  ", "2025-01-01", None);
        assert_eq!(e.display_title(), "Event");
        e.meeting_activity = Some("Cheese night".to_string());
        assert_eq!(e.display_title(), "Cheese night");
    }

    #[test]
    fn test_null_and_numeric_fields_degrade() {
        let events: Vec<Event> = serde_json::from_value(serde_json::json!([
            { "title": "Good", "start": "2025-03-06T19:30:00+11:00" },
            { "title": null, "start": "2025-04-03T19:30:00+11:00", "location": 42, "meetingActivity": "Cheese night" }
        ]))
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].display_title(), "Cheese night");
        assert_eq!(events[1].location.as_deref(), Some("42"));
    }
}
