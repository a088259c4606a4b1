//! Serializable view models handed to the templates, plus the schema.org
//! JSON-LD documents embedded in each widget.

use reqwest::Url;
use serde::Serialize;
use serde_json::{json, Value};

use crate::browser::{share_url, ResultsBrowser};
use crate::config::SiteConfig;
use crate::events::{group_by_month, ScheduledEvent, Schedule};
use crate::format::{
    edition_display, edition_label, format_meeting_line, format_score, format_short_date, format_time,
    non_empty,
};
use crate::leaderboard::Metric;
use crate::results::{Entry, YearData};

/// Rows shown per leaderboard panel
pub const LEADERBOARD_ROWS: usize = 10;

pub const NO_UPCOMING_EVENTS: &str = "No upcoming events. Check back soon!";
pub const EVENTS_LOAD_ERROR: &str = "Sorry, we couldn't load events right now.";
pub const RESULTS_LOAD_ERROR: &str = "We were unable to load the show results. Please refresh to try again.";
pub const RESULTS_EMPTY: &str = "No years available in the results dataset.";
pub const NO_MATCHING_ENTRIES: &str = "No results match your filters yet. Try a different class or search term.";

const FALLBACK_LOCATION: &str = "TBA";
const FALLBACK_REGION: &str = "Sydney, NSW";

// ============================================================================
// JSON-LD
// ============================================================================

/// Serializes structured data for a `<script type="application/ld+json">`
/// body. `<` is escaped so the payload can never close the script element.
pub fn embed_json_ld(value: &Value) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_default()
        .replace('<', "\\u003c")
}

/// schema.org `Event` for a club meeting or calendar entry
pub fn event_json_ld(scheduled: &ScheduledEvent, config: &SiteConfig) -> Value {
    let event = scheduled.event;
    let mut parts: Vec<String> = Vec::new();
    if let Some(description) = non_empty(&event.description) {
        parts.push(description.to_string());
    }
    if let Some(activity) = non_empty(&event.meeting_activity) {
        parts.push(format!("Meeting activity: {}", activity));
    }
    if let Some(mini) = non_empty(&event.mini_competition) {
        parts.push(format!("Mini competition: {}", mini));
    }
    if let Some(comments) = non_empty(&event.comments) {
        parts.push(format!("Notes: {}", comments));
    }

    let location = non_empty(&event.location);
    let end = scheduled.end.unwrap_or(scheduled.start);
    json!({
        "@context": "https://schema.org",
        "@type": "Event",
        "name": event.display_title(),
        "startDate": scheduled.start.to_rfc3339(),
        "endDate": end.to_rfc3339(),
        "eventStatus": "https://schema.org/EventScheduled",
        "eventAttendanceMode": "https://schema.org/OfflineEventAttendanceMode",
        "location": {
            "@type": "Place",
            "name": location
                .or(non_empty(&config.default_location_name))
                .unwrap_or(FALLBACK_LOCATION),
            "address": location
                .or(non_empty(&config.default_location_address))
                .unwrap_or(FALLBACK_REGION),
        },
        "organizer": {
            "@type": "Organization",
            "name": config.club_name,
            "url": config.site_url,
        },
        "offers": {
            "@type": "Offer",
            "price": "0",
            "priceCurrency": config.currency,
            "availability": "https://schema.org/InStock",
            "url": config.site_url,
        },
        "description": parts.join("\n\n"),
    })
}

/// schema.org `Event` describing a completed show year. The url carries
/// the dataset year so it reopens the same page.
pub fn show_json_ld(data: &YearData, config: &SiteConfig) -> Value {
    let show = &data.show;
    let year = data.display_year();
    let label = edition_label(show.edition.as_deref(), show.edition_number, year);
    let base_name = non_empty(&show.name).unwrap_or(config.club_name.as_str());
    let start = non_empty(&show.date_range.start)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-09-01", year));
    let end = non_empty(&show.date_range.end)
        .or(non_empty(&show.date_range.start))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-09-30", year));

    let mut organizer = json!({
        "@type": "Organization",
        "name": non_empty(&show.organizer.name).unwrap_or(config.club_name.as_str()),
    });
    if let Some(website) = non_empty(&show.organizer.website) {
        organizer["url"] = Value::from(website);
    }

    json!({
        "@context": "https://schema.org",
        "@type": "Event",
        "name": format!("{} — {} {}", base_name, label, year),
        "eventStatus": "https://schema.org/EventCompleted",
        "location": {
            "@type": "Place",
            "name": non_empty(&show.location).unwrap_or(config.show_location.as_str()),
        },
        "startDate": start,
        "endDate": end,
        "url": results_share_url(config, data.year),
        "organizer": organizer,
    })
}

fn results_share_url(config: &SiteConfig, year: i32) -> String {
    match Url::parse(&config.results_url()) {
        Ok(page) => share_url(&page, year).to_string(),
        Err(_) => format!("{}?year={}", config.results_url(), year),
    }
}

// ============================================================================
// NEXT MEETING
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct NextMeetingView {
    pub date_line: String,
    pub start_iso: String,
    pub activity: Option<String>,
    pub location_name: String,
    pub location_address: Option<String>,
    pub json_ld: String,
}

/// Banner for the next meeting. The default address only accompanies the
/// default location name.
pub fn next_meeting_view(scheduled: &ScheduledEvent, config: &SiteConfig) -> NextMeetingView {
    let event = scheduled.event;
    let location = non_empty(&event.location);
    let location_name = location
        .or(non_empty(&config.default_location_name))
        .unwrap_or(FALLBACK_LOCATION)
        .to_string();
    let location_address = match location {
        Some(_) => None,
        None => non_empty(&config.default_location_address).map(str::to_string),
    };

    NextMeetingView {
        date_line: format_meeting_line(&scheduled.start),
        start_iso: scheduled.start.to_rfc3339(),
        activity: non_empty(&event.meeting_activity).map(str::to_string),
        location_name,
        location_address,
        json_ld: embed_json_ld(&event_json_ld(scheduled, config)),
    }
}

// ============================================================================
// EVENTS LIST
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventItemView {
    pub title: String,
    pub start_iso: String,
    pub when: String,
    pub end_iso: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub details: Vec<DetailRow>,
    pub ics_url: String,
    pub subscribe_label: String,
    pub json_ld: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthGroupView {
    pub label: String,
    pub events: Vec<EventItemView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventsView {
    pub upcoming: Vec<MonthGroupView>,
    pub past: Vec<EventItemView>,
    pub empty_message: &'static str,
}

pub fn event_item_view(scheduled: &ScheduledEvent, config: &SiteConfig) -> EventItemView {
    let event = scheduled.event;
    let title = event.display_title().to_string();
    let mut details = Vec::new();
    for (label, value) in [
        ("Meeting Activity", &event.meeting_activity),
        ("Mini Competition", &event.mini_competition),
        ("Comments", &event.comments),
    ] {
        if let Some(value) = non_empty(value) {
            details.push(DetailRow { label, value: value.to_string() });
        }
    }

    EventItemView {
        start_iso: scheduled.start.to_rfc3339(),
        when: format!("{}, {}", format_short_date(&scheduled.start), format_time(&scheduled.start)),
        end_iso: scheduled.end.map(|end| end.to_rfc3339()),
        end_time: scheduled.end.map(|end| format_time(&end)),
        location: non_empty(&event.location).map(str::to_string),
        description: non_empty(&event.description).map(str::to_string),
        details,
        ics_url: config.ics_url.clone(),
        subscribe_label: format!("Subscribe to calendar for {}", title),
        json_ld: embed_json_ld(&event_json_ld(scheduled, config)),
        title,
    }
}

pub fn events_view(schedule: &Schedule, config: &SiteConfig) -> EventsView {
    let upcoming = group_by_month(&schedule.upcoming)
        .into_iter()
        .map(|group| MonthGroupView {
            label: group.label,
            events: group.events.iter().map(|e| event_item_view(e, config)).collect(),
        })
        .collect();
    EventsView {
        upcoming,
        past: schedule.past.iter().map(|e| event_item_view(e, config)).collect(),
        empty_message: NO_UPCOMING_EVENTS,
    }
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// A champion or class winner with its detail spans
#[derive(Debug, Clone, Serialize)]
pub struct AwardView {
    pub winemaker: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassWinnersView {
    pub code: String,
    pub winners: Vec<AwardView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabView {
    pub key: &'static str,
    pub panel_key: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankRow {
    pub rank: usize,
    pub winemaker: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardPanelView {
    pub panel_key: &'static str,
    pub metric_key: &'static str,
    pub label: &'static str,
    pub value_header: &'static str,
    pub rows: Vec<RankRow>,
    pub hidden: bool,
    pub empty_message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryRowView {
    pub class_no: String,
    pub entry_no: String,
    pub winemaker: String,
    pub wine: String,
    pub score: Option<f64>,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub page_title: String,
    pub year: i32,
    pub display_year: i32,
    pub edition_display: String,
    pub year_options: Vec<OptionView>,
    pub class_options: Vec<OptionView>,
    pub search: String,
    pub champions: Vec<AwardView>,
    pub tabs: Vec<TabView>,
    pub leaderboards: Vec<LeaderboardPanelView>,
    pub has_classes: bool,
    pub best_in_class: Vec<ClassWinnersView>,
    pub entries: Vec<EntryRowView>,
    pub no_entries_message: &'static str,
    pub summary: String,
    pub share_url: String,
    pub json_ld: String,
}

/// Message shown in every results panel instead of data
#[derive(Debug, Clone, Serialize)]
pub struct ResultsMessageView {
    pub message: String,
    pub panels: Vec<&'static str>,
}

impl ResultsMessageView {
    pub fn new(message: &str) -> Self {
        ResultsMessageView {
            message: message.to_string(),
            panels: Metric::ALL.iter().map(|m| m.panel_key()).collect(),
        }
    }
}

/// Builds every results panel for the browser's current selection
pub fn results_view(browser: &ResultsBrowser, config: &SiteConfig) -> Option<ResultsView> {
    let data = browser.year_data()?;
    let selection = browser.selection();
    let display_year = data.display_year();
    let show = &data.show;

    let year_options = browser
        .years()
        .into_iter()
        .map(|year| OptionView {
            value: year.to_string(),
            label: year.to_string(),
            selected: year == selection.year,
        })
        .collect();

    let mut class_options = vec![OptionView {
        value: String::new(),
        label: "All classes".to_string(),
        selected: selection.class_no.is_empty(),
    }];
    class_options.extend(data.classes.iter().map(|class_info| {
        let code = class_info.code.clone().unwrap_or_default();
        let label = match non_empty(&class_info.name) {
            Some(name) => format!("{} — {}", code, name),
            None => code.clone(),
        };
        OptionView {
            selected: !selection.class_no.is_empty() && code == selection.class_no,
            value: code,
            label,
        }
    }));

    let champions = data.champions().map(champion_view).collect();

    let tabs = Metric::ALL
        .iter()
        .map(|metric| TabView {
            key: metric.key(),
            panel_key: metric.panel_key(),
            label: metric.label(),
            selected: *metric == selection.active_leaderboard,
        })
        .collect();

    let leaderboards = Metric::ALL
        .iter()
        .map(|metric| LeaderboardPanelView {
            panel_key: metric.panel_key(),
            metric_key: metric.key(),
            label: metric.label(),
            value_header: metric.value_header(),
            rows: data
                .leaderboards
                .rows(*metric)
                .iter()
                .take(LEADERBOARD_ROWS)
                .enumerate()
                .map(|(index, row)| RankRow {
                    rank: index + 1,
                    winemaker: row.winemaker.clone(),
                    value: row.value,
                })
                .collect(),
            hidden: *metric != selection.active_leaderboard,
            empty_message: format!("{} leaderboard will be published soon.", metric.label()),
        })
        .collect();

    let best_in_class = data
        .classes
        .iter()
        .map(|class_info| ClassWinnersView {
            code: class_info.code.clone().unwrap_or_default(),
            winners: data
                .best_in_class()
                .filter(|entry| class_info.id.is_some() && entry.class_id == class_info.id)
                .map(class_winner_view)
                .collect(),
        })
        .collect();

    let filtered = browser.filtered_entries();
    let summary = entries_summary(data, filtered.len(), &selection.class_no, &selection.search);
    let entries = filtered.into_iter().map(entry_row_view).collect();

    let label = edition_label(show.edition.as_deref(), show.edition_number, display_year);

    Some(ResultsView {
        page_title: format!("{} Show Results — {} {}", config.club_short_name, label, display_year),
        year: selection.year,
        display_year,
        edition_display: edition_display(show.edition.as_deref(), show.edition_number, display_year),
        year_options,
        class_options,
        search: selection.search.clone(),
        champions,
        tabs,
        leaderboards,
        has_classes: !data.classes.is_empty(),
        best_in_class,
        entries,
        no_entries_message: NO_MATCHING_ENTRIES,
        summary,
        share_url: results_share_url(config, selection.year),
        json_ld: embed_json_ld(&show_json_ld(data, config)),
    })
}

fn wine_detail(entry: &Entry) -> Option<String> {
    [&entry.wine_type, &entry.wine_name]
        .into_iter()
        .find(|s| !s.is_empty())
        .cloned()
}

fn champion_view(entry: &Entry) -> AwardView {
    let mut details = Vec::new();
    details.extend(wine_detail(entry));
    if let Some(vintage) = non_empty(&entry.wine_vintage) {
        details.push(format!("Vintage {}", vintage));
    }
    if !entry.class_no.is_empty() {
        details.push(format!("Class {}", entry.class_no));
    }
    if let Some(medal) = entry.display_medal() {
        details.push(format!("{} Medal", medal));
    }
    if entry.score.is_some() {
        details.push(format!("Score {}", format_score(entry.score)));
    }
    AwardView {
        winemaker: entry.winemaker.clone(),
        details,
    }
}

fn class_winner_view(entry: &Entry) -> AwardView {
    let mut details = Vec::new();
    details.extend(wine_detail(entry));
    if let Some(medal) = entry.display_medal() {
        details.push(format!("{} Medal", medal));
    }
    if entry.score.is_some() {
        details.push(format!("Score {}", format_score(entry.score)));
    }
    AwardView {
        winemaker: entry.winemaker.clone(),
        details,
    }
}

/// "Shiraz (2022)", falling back to the wine type
pub fn wine_label(entry: &Entry) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !entry.wine_name.is_empty() {
        parts.push(entry.wine_name.clone());
    } else if !entry.wine_type.is_empty() {
        parts.push(entry.wine_type.clone());
    }
    if let Some(vintage) = non_empty(&entry.wine_vintage) {
        parts.push(format!("({})", vintage));
    }
    parts.join(" ")
}

fn entry_row_view(entry: &Entry) -> EntryRowView {
    let mut flags = Vec::new();
    if entry.best_in_class {
        flags.push("BIC".to_string());
    }
    if entry.champion {
        flags.push("Champion".to_string());
    }
    if let Some(medal) = entry.display_medal() {
        flags.push(medal.to_string());
    }
    EntryRowView {
        class_no: entry.class_no.clone(),
        entry_no: entry.entry_no.clone(),
        winemaker: entry.winemaker.clone(),
        wine: wine_label(entry),
        score: entry.score,
        flags,
    }
}

/// "3 entries from 2024 in Class 5A — Dry Red matching “shiraz”."
pub fn entries_summary(data: &YearData, count: usize, class_no: &str, search: &str) -> String {
    let class_segment = if class_no.is_empty() {
        "all classes".to_string()
    } else {
        match data.class_by_code(class_no) {
            Some(class_info) => match non_empty(&class_info.name) {
                Some(name) => format!("Class {} — {}", class_no, name),
                None => format!("Class {}", class_no),
            },
            None => format!("Class {}", class_no),
        }
    };
    let search_segment = if search.is_empty() {
        String::new()
    } else {
        format!(" matching “{}”", search)
    };
    let plural = if count == 1 { "entry" } else { "entries" };
    format!(
        "{} {} from {} in {}{}.",
        count,
        plural,
        data.display_year(),
        class_segment,
        search_segment
    )
}
