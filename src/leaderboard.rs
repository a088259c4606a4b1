use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::results::Entry;

/// Number of best scores summed for the top-5 leaderboard
pub const TOP_SCORES: usize = 5;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// The three leaderboard metrics, keyed as the results page tabs are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "averageScore")]
    Average,
    #[serde(rename = "medianScore")]
    Median,
    #[serde(rename = "sumTop5")]
    SumTop5,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Average, Metric::Median, Metric::SumTop5];

    /// Tab key, e.g. "averageScore"
    pub fn key(self) -> &'static str {
        match self {
            Metric::Average => "averageScore",
            Metric::Median => "medianScore",
            Metric::SumTop5 => "sumTop5",
        }
    }

    /// Panel id suffix, e.g. "average" for `panel-average`
    pub fn panel_key(self) -> &'static str {
        match self {
            Metric::Average => "average",
            Metric::Median => "median",
            Metric::SumTop5 => "top5",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Average => "Average Score",
            Metric::Median => "Median Score",
            Metric::SumTop5 => "Sum of Top 5",
        }
    }

    pub fn value_header(self) -> &'static str {
        match self {
            Metric::SumTop5 => "Total",
            _ => "Score",
        }
    }

    /// Accepts tab keys and panel keys
    pub fn parse(value: &str) -> Option<Metric> {
        Metric::ALL
            .into_iter()
            .find(|m| m.key().eq_ignore_ascii_case(value) || m.panel_key().eq_ignore_ascii_case(value))
    }
}

/// One ranked entrant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub key: String,
    pub winemaker: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaderboards {
    pub average: Vec<LeaderboardRow>,
    pub median: Vec<LeaderboardRow>,
    pub sum_top5: Vec<LeaderboardRow>,
}

impl Leaderboards {
    pub fn rows(&self, metric: Metric) -> &[LeaderboardRow] {
        match metric {
            Metric::Average => &self.average,
            Metric::Median => &self.median,
            Metric::SumTop5 => &self.sum_top5,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.average.is_empty()
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Scores grouped per entrant, in first-seen order
struct EntrantScores {
    key: String,
    winemaker: String,
    scores: Vec<f64>,
}

/// Per-entrant average, median and sum of top 5 for one year's entries.
/// Entrants without a numeric score are left out of every list. Each list
/// is sorted descending; ties keep first-seen entrant order.
pub fn compute_leaderboards(entries: &[Entry]) -> Leaderboards {
    let mut groups: Vec<EntrantScores> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let Some(score) = entry.score else { continue };
        let key = entry.entrant_key();
        let position = *positions.entry(key.clone()).or_insert_with(|| {
            groups.push(EntrantScores {
                key,
                winemaker: entry.winemaker.clone(),
                scores: Vec::new(),
            });
            groups.len() - 1
        });
        groups[position].scores.push(score);
    }

    let ranked = |value: fn(&[f64]) -> f64| {
        let mut rows: Vec<LeaderboardRow> = groups
            .iter()
            .map(|group| LeaderboardRow {
                key: group.key.clone(),
                winemaker: group.winemaker.clone(),
                value: value(&group.scores),
            })
            .collect();
        rows.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
        rows
    };

    Leaderboards {
        average: ranked(mean),
        median: ranked(median),
        sum_top5: ranked(sum_top),
    }
}

/// Arithmetic mean; callers guarantee at least one value
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Middle value after an ascending sort; even lengths average the two middles
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[middle - 1] + sorted[middle]) / 2.0
    } else {
        sorted[middle]
    }
}

/// Sum of the highest `TOP_SCORES` values, or of all when fewer
pub fn sum_top(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    sorted.iter().take(TOP_SCORES).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(winemaker: &str, id: Option<&str>, score: Option<f64>) -> Entry {
        Entry {
            winemaker: winemaker.to_string(),
            winemaker_id: id.map(str::to_string),
            score,
            ..Entry::default()
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[19.0, 17.0, 18.0]), 18.0);
        assert_eq!(median(&[18.0, 17.0]), 17.5);
        assert_eq!(median(&[12.0]), 12.0);
    }

    #[test]
    fn test_sum_top() {
        assert_eq!(sum_top(&[10.0, 20.0, 15.0]), 45.0);
        assert_eq!(sum_top(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]), 25.0);
    }

    #[test]
    fn test_compute_leaderboards() {
        let entries = vec![
            entry("Alice", Some("a"), Some(18.0)),
            entry("Bob", Some("b"), Some(16.0)),
            entry("Alice", Some("a"), Some(16.0)),
            entry("Bob", Some("b"), None),
            entry("Carol", None, None),
        ];
        let boards = compute_leaderboards(&entries);

        assert_eq!(boards.average.len(), 2);
        assert_eq!(boards.average[0].winemaker, "Alice");
        assert_eq!(boards.average[0].value, 17.0);
        assert_eq!(boards.average[1].value, 16.0);
        assert_eq!(boards.median[0].value, 17.0);
        assert_eq!(boards.sum_top5[0].value, 34.0);
        assert!(boards.average.iter().all(|r| r.winemaker != "Carol"));
    }

    #[test]
    fn test_groups_by_lowercase_name_without_id() {
        let entries = vec![
            entry("Dave Grape", None, Some(14.0)),
            entry("dave grape", None, Some(16.0)),
        ];
        let boards = compute_leaderboards(&entries);
        assert_eq!(boards.average.len(), 1);
        assert_eq!(boards.average[0].winemaker, "Dave Grape");
        assert_eq!(boards.average[0].value, 15.0);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let entries = vec![
            entry("Zed", Some("z"), Some(15.0)),
            entry("Amy", Some("y"), Some(15.0)),
        ];
        let boards = compute_leaderboards(&entries);
        let names: Vec<_> = boards.average.iter().map(|r| r.winemaker.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Amy"]);
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!(Metric::parse("sumTop5"), Some(Metric::SumTop5));
        assert_eq!(Metric::parse("top5"), Some(Metric::SumTop5));
        assert_eq!(Metric::parse("median"), Some(Metric::Median));
        assert_eq!(Metric::parse("best"), None);
    }
}
