pub mod analytics;
pub mod browser;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod format;
pub mod ics;
pub mod import;
pub mod leaderboard;
pub mod lenient;
pub mod output;
pub mod recipe;
pub mod render;
pub mod results;
pub mod views;

use chrono::{DateTime, FixedOffset};

use fetch::{fetch_json, fetch_json_pair};

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================
pub use analytics::{AnalyticsEvent, AnalyticsEventName, AnalyticsSink, MemorySink, TracingSink};
pub use browser::{filter_entries, share_url, year_from_query, ResultsBrowser, Selection, TabKey};
pub use config::{CalendarConfig, SiteConfig};
pub use error::{Result, SiteError};
pub use events::{find_next_event, split_schedule, Event, ScheduledEvent, Schedule};
pub use ics::generate_ics;
pub use import::{import_events, import_events_from_path, IdMode, ImportOptions};
pub use leaderboard::{compute_leaderboards, Leaderboards, LeaderboardRow, Metric};
pub use output::{write_entries_csv, write_leaderboards_csv, write_output, OutputOptions};
pub use recipe::{calculate, RecipeDisplay, RecipeInput, RecipeOutput};
pub use render::{text_content, Renderer};
pub use results::{Entry, ResultsDocument, YearCache, YearData};

// ============================================================================
// DATA LOADING
// ============================================================================

/// Where the results dataset comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsSource {
    /// One year-keyed document
    YearKeyed(String),
    /// An index document plus a flat entries array, fetched together
    Split { index: String, entries: String },
}

/// Loads events.json from a path or URL. Elements that aren't event
/// objects are dropped with a warning.
pub async fn load_events(source: &str) -> Result<Vec<Event>> {
    let items: Vec<serde_json::Value> = fetch_json(source).await?;
    let events: Vec<Event> = lenient::parse_each(serde_json::Value::Array(items), "event");
    tracing::debug!(source, count = events.len(), "loaded events");
    Ok(events)
}

/// Loads and normalizes the results dataset. For the split layout both
/// documents are requested concurrently and either failure fails the load.
pub async fn load_results(source: &ResultsSource) -> Result<YearCache> {
    let document = match source {
        ResultsSource::YearKeyed(path) => ResultsDocument::YearKeyed(fetch_json(path).await?),
        ResultsSource::Split { index, entries } => {
            let (index, entries): (results::SplitIndex, serde_json::Value) = fetch_json_pair(index, entries).await?;
            ResultsDocument::Split {
                index,
                entries: results::parse_split_entries(entries),
            }
        }
    };
    let cache = document.into_cache();
    tracing::debug!(years = ?cache.years(), "loaded results");
    Ok(cache)
}

// ============================================================================
// WIDGETS
// ============================================================================

/// Next-meeting banner; the placeholder when nothing is upcoming
pub fn next_meeting_html(
    renderer: &Renderer,
    events: &[Event],
    now: DateTime<FixedOffset>,
    config: &SiteConfig,
) -> Result<String> {
    let offset = config.offset()?;
    let view = find_next_event(events, now, offset).map(|next| views::next_meeting_view(&next, config));
    renderer.render_next_meeting(view.as_ref())
}

/// Upcoming events by month, then past events
pub fn events_html(
    renderer: &Renderer,
    events: &[Event],
    now: DateTime<FixedOffset>,
    config: &SiteConfig,
) -> Result<String> {
    let offset = config.offset()?;
    let schedule = split_schedule(events, now, offset);
    renderer.render_events(&views::events_view(&schedule, config))
}

/// Results page for the browser's selection; the empty-dataset message when
/// there is no browser
pub fn results_html(renderer: &Renderer, browser: Option<&ResultsBrowser>, config: &SiteConfig) -> Result<String> {
    match browser.and_then(|b| views::results_view(b, config)) {
        Some(view) => renderer.render_results(&view),
        None => renderer.render_results_message(views::RESULTS_EMPTY),
    }
}
