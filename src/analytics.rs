use std::sync::Mutex;

use serde::Serialize;
use serde_json::{Map, Value};

/// Named interactions reported to the analytics sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsEventName {
    ResultsView,
    FilterChange,
    Search,
    LeaderboardTabView,
}

impl AnalyticsEventName {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalyticsEventName::ResultsView => "results_view",
            AnalyticsEventName::FilterChange => "filter_change",
            AnalyticsEventName::Search => "search",
            AnalyticsEventName::LeaderboardTabView => "leaderboard_tab_view",
        }
    }
}

/// `{ "event": ..., "year": ..., ...payload }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub event: AnalyticsEventName,
    pub year: Option<i32>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl AnalyticsEvent {
    pub fn new(event: AnalyticsEventName, year: Option<i32>) -> Self {
        AnalyticsEvent {
            event,
            year,
            payload: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }
}

/// Receives analytics events. Sinks must never fail the caller.
pub trait AnalyticsSink {
    fn push(&self, event: &AnalyticsEvent);
}

/// Logs each event at info level
#[derive(Debug, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn push(&self, event: &AnalyticsEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        tracing::info!(event = event.event.as_str(), %payload, "analytics");
    }
}

/// Keeps events in memory, e.g. to dump them after a run
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl AnalyticsSink for MemorySink {
    fn push(&self, event: &AnalyticsEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
