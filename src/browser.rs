use std::cmp::Ordering;

use reqwest::Url;
use serde_json::Value;

use crate::analytics::{AnalyticsEvent, AnalyticsEventName, AnalyticsSink};
use crate::format::natural_cmp;
use crate::leaderboard::Metric;
use crate::results::{Entry, YearCache, YearData};

/// Query parameter holding the selected year
pub const YEAR_PARAM: &str = "year";

// ============================================================================
// FILTER / SORT
// ============================================================================

/// Current selection on the results page
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub year: i32,
    /// Empty means all classes
    pub class_no: String,
    /// Trimmed; empty means no search
    pub search: String,
    pub active_leaderboard: Metric,
}

impl Selection {
    pub fn new(year: i32) -> Self {
        Selection {
            year,
            class_no: String::new(),
            search: String::new(),
            active_leaderboard: Metric::Average,
        }
    }
}

/// Entries matching the class and search filters, best score first.
///
/// Missing scores rank last; ties fall back to class sort order, then
/// numeric-aware entry number.
pub fn filter_entries<'a>(entries: &'a [Entry], class_no: &str, search: &str) -> Vec<&'a Entry> {
    let needle = search.trim().to_lowercase();
    let mut filtered: Vec<&Entry> = entries
        .iter()
        .filter(|entry| class_no.is_empty() || entry.class_no == class_no)
        .filter(|entry| needle.is_empty() || search_haystack(entry).contains(&needle))
        .collect();
    filtered.sort_by(|a, b| compare_entries(a, b));
    filtered
}

fn search_haystack(entry: &Entry) -> String {
    format!("{} {} {}", entry.winemaker, entry.wine_type, entry.wine_name).to_lowercase()
}

/// Score descending, then class sort order, then entry number
pub fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    let score_a = a.score.unwrap_or(f64::NEG_INFINITY);
    let score_b = b.score.unwrap_or(f64::NEG_INFINITY);
    score_b
        .partial_cmp(&score_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            let order_a = a.class_sort_order.unwrap_or(i64::MAX);
            let order_b = b.class_sort_order.unwrap_or(i64::MAX);
            order_a.cmp(&order_b)
        })
        .then_with(|| natural_cmp(&a.entry_no, &b.entry_no))
}

// ============================================================================
// URL STATE
// ============================================================================

/// Year requested by a query string such as `?year=2024&x=1`
pub fn year_from_query(query: &str) -> Option<i32> {
    let query = query.trim_start_matches('?');
    let base = Url::parse("https://localhost/").ok()?;
    let url = base.join(&format!("?{}", query)).ok()?;
    let year = url
        .query_pairs()
        .find(|(key, _)| key == YEAR_PARAM)
        .map(|(_, value)| value.into_owned())?;
    parse_leading_int(&year)
}

/// Same page with the year parameter set, keeping other parameters
pub fn share_url(page: &Url, year: i32) -> Url {
    let kept: Vec<(String, String)> = page
        .query_pairs()
        .filter(|(key, _)| key != YEAR_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut url = page.clone();
    url.set_fragment(None);
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(YEAR_PARAM, &year.to_string());
    }
    url
}

fn parse_leading_int(value: &str) -> Option<i32> {
    let value = value.trim();
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

// ============================================================================
// BROWSER STATE
// ============================================================================

/// Keys handled by the leaderboard tab list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabKey {
    ArrowLeft,
    ArrowRight,
    Home,
    End,
}

impl TabKey {
    pub fn parse(key: &str) -> Option<TabKey> {
        match key {
            "ArrowLeft" => Some(TabKey::ArrowLeft),
            "ArrowRight" => Some(TabKey::ArrowRight),
            "Home" => Some(TabKey::Home),
            "End" => Some(TabKey::End),
            _ => None,
        }
    }
}

/// Interactive state of the results page over one loaded dataset
pub struct ResultsBrowser<'s> {
    cache: YearCache,
    selection: Selection,
    sink: Option<&'s dyn AnalyticsSink>,
}

impl<'s> ResultsBrowser<'s> {
    /// Opens the browser on the requested year when it exists, else the
    /// newest. None when the dataset holds no years.
    pub fn open(
        cache: YearCache,
        requested_year: Option<i32>,
        sink: Option<&'s dyn AnalyticsSink>,
    ) -> Option<Self> {
        let years = cache.years();
        let newest = *years.first()?;
        let year = requested_year.filter(|y| years.contains(y)).unwrap_or(newest);
        let browser = ResultsBrowser {
            cache,
            selection: Selection::new(year),
            sink,
        };
        browser.track(AnalyticsEventName::ResultsView, Vec::new());
        Some(browser)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn cache(&self) -> &YearCache {
        &self.cache
    }

    /// Newest first
    pub fn years(&self) -> Vec<i32> {
        self.cache.years()
    }

    pub fn year_data(&self) -> Option<&YearData> {
        self.cache.get(self.selection.year)
    }

    /// Switches year and clears class and search. Unknown years are ignored.
    pub fn select_year(&mut self, year: i32) -> bool {
        if self.cache.get(year).is_none() {
            tracing::debug!(year, "ignoring unknown year");
            return false;
        }
        self.selection.year = year;
        self.selection.class_no.clear();
        self.selection.search.clear();
        self.track(AnalyticsEventName::FilterChange, vec![("classNo", Value::Null)]);
        true
    }

    /// Empty code selects all classes
    pub fn select_class(&mut self, class_no: &str) {
        self.selection.class_no = class_no.to_string();
        let value = if class_no.is_empty() { Value::Null } else { Value::from(class_no) };
        self.track(AnalyticsEventName::FilterChange, vec![("classNo", value)]);
    }

    pub fn search(&mut self, query: &str) {
        self.selection.search = query.trim().to_string();
        let value = if self.selection.search.is_empty() {
            Value::Null
        } else {
            Value::from(self.selection.search.clone())
        };
        self.track(AnalyticsEventName::Search, vec![("query", value)]);
    }

    /// Activates a leaderboard tab; re-selecting the active tab is a no-op
    pub fn select_tab(&mut self, metric: Metric) -> bool {
        if metric == self.selection.active_leaderboard {
            return false;
        }
        self.selection.active_leaderboard = metric;
        self.track(AnalyticsEventName::LeaderboardTabView, vec![("tab", Value::from(metric.key()))]);
        true
    }

    /// Keyboard navigation across tabs; arrows wrap around
    pub fn tab_key(&mut self, key: TabKey) -> bool {
        let tabs = Metric::ALL;
        let current = tabs
            .iter()
            .position(|m| *m == self.selection.active_leaderboard)
            .unwrap_or(0);
        let last = tabs.len() - 1;
        let next = match key {
            TabKey::ArrowLeft if current == 0 => last,
            TabKey::ArrowLeft => current - 1,
            TabKey::ArrowRight if current == last => 0,
            TabKey::ArrowRight => current + 1,
            TabKey::Home => 0,
            TabKey::End => last,
        };
        self.select_tab(tabs[next])
    }

    /// Entries for the current selection, in display order
    pub fn filtered_entries(&self) -> Vec<&Entry> {
        match self.year_data() {
            Some(data) => filter_entries(&data.entries, &self.selection.class_no, &self.selection.search),
            None => Vec::new(),
        }
    }

    fn track(&self, name: AnalyticsEventName, payload: Vec<(&str, Value)>) {
        let Some(sink) = self.sink else { return };
        let event = payload
            .into_iter()
            .fold(AnalyticsEvent::new(name, Some(self.selection.year)), |event, (key, value)| {
                event.with(key, value)
            });
        sink.push(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(class_no: &str, order: Option<i64>, entry_no: &str, score: Option<f64>) -> Entry {
        Entry {
            class_no: class_no.to_string(),
            class_sort_order: order,
            entry_no: entry_no.to_string(),
            score,
            winemaker: format!("Maker {}", entry_no),
            ..Entry::default()
        }
    }

    #[test]
    fn test_missing_scores_rank_last() {
        let entries = vec![
            entry("1", Some(1), "1", Some(18.0)),
            entry("1", Some(1), "2", None),
            entry("1", Some(1), "3", Some(19.0)),
        ];
        let scores: Vec<_> = filter_entries(&entries, "", "").iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![Some(19.0), Some(18.0), None]);
    }

    #[test]
    fn test_tiebreakers() {
        let entries = vec![
            entry("9", None, "1", Some(15.0)),
            entry("2", Some(2), "10", Some(15.0)),
            entry("2", Some(2), "9", Some(15.0)),
            entry("1", Some(1), "30", Some(15.0)),
        ];
        let order: Vec<_> = filter_entries(&entries, "", "").iter().map(|e| e.entry_no.as_str()).collect();
        assert_eq!(order, vec!["30", "9", "10", "1"]);
    }

    #[test]
    fn test_class_and_search_filters() {
        let mut shiraz = entry("5A", Some(1), "1", Some(17.0));
        shiraz.wine_name = "Barossa Shiraz".to_string();
        let mut merlot = entry("5A", Some(1), "2", Some(16.0));
        merlot.wine_type = "Merlot".to_string();
        let other = entry("5B", Some(2), "3", Some(18.0));
        let entries = vec![shiraz, merlot, other];

        let by_class = filter_entries(&entries, "5A", "");
        assert_eq!(by_class.len(), 2);
        assert!(by_class.iter().all(|e| e.class_no == "5A"));

        let narrowed = filter_entries(&entries, "5A", "  SHIRAZ ");
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].entry_no, "1");

        let by_maker = filter_entries(&entries, "", "maker 3");
        assert_eq!(by_maker.len(), 1);
    }

    #[test]
    fn test_year_from_query() {
        assert_eq!(year_from_query("?year=2024"), Some(2024));
        assert_eq!(year_from_query("class=5A&year=2023"), Some(2023));
        assert_eq!(year_from_query("year=abc"), None);
        assert_eq!(year_from_query(""), None);
    }

    #[test]
    fn test_share_url_rewrites_year() {
        let page = Url::parse("https://example.org/results/?year=2022&ref=mail#top").unwrap();
        let url = share_url(&page, 2024);
        assert_eq!(url.as_str(), "https://example.org/results/?ref=mail&year=2024");
    }

    #[test]
    fn test_tab_keys_wrap() {
        let mut cache = YearCache::default();
        cache.insert(YearData { year: 2024, ..YearData::default() });
        let mut browser = ResultsBrowser::open(cache, None, None).unwrap();

        assert!(browser.tab_key(TabKey::ArrowLeft));
        assert_eq!(browser.selection().active_leaderboard, Metric::SumTop5);
        assert!(browser.tab_key(TabKey::ArrowRight));
        assert_eq!(browser.selection().active_leaderboard, Metric::Average);
        assert!(browser.tab_key(TabKey::End));
        assert!(!browser.tab_key(TabKey::End));
        assert!(browser.tab_key(TabKey::Home));
        assert_eq!(browser.selection().active_leaderboard, Metric::Average);
    }
}
