use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::natural_cmp;
use crate::leaderboard::{compute_leaderboards, Leaderboards};
use crate::lenient::{
    lenient_bool, lenient_integer, lenient_object, lenient_score, lenient_string, lenient_strings, lenient_text,
    lenient_vec, lenient_year, parse_each,
};

/// Winemaker label for entries whose entrant can't be resolved
pub const UNNAMED_ENTRANT: &str = "Unnamed entrant";

// ============================================================================
// RAW SCHEMA - YEAR-KEYED
// ============================================================================

/// One year of the year-keyed results.json document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawYear {
    #[serde(deserialize_with = "lenient_object")]
    pub show: ShowInfo,
    #[serde(deserialize_with = "lenient_vec")]
    pub classes: Vec<ClassInfo>,
    #[serde(deserialize_with = "lenient_vec")]
    pub entrants: Vec<RawEntrant>,
    #[serde(deserialize_with = "lenient_vec")]
    pub entries: Vec<RawEntry>,
}

/// Show details published alongside a year's results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_integer")]
    pub year: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    pub edition: Option<String>,
    #[serde(deserialize_with = "lenient_integer")]
    pub edition_number: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient_object")]
    pub date_range: DateRange,
    #[serde(deserialize_with = "lenient_object")]
    pub organizer: Organizer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    #[serde(deserialize_with = "lenient_string")]
    pub start: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Organizer {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub website: Option<String>,
}

/// A judging class
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_integer")]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEntrant {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub display_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub club: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEntry {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub class_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub entrant_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub exhibit_number: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub entry_number: Option<String>,
    #[serde(deserialize_with = "lenient_object")]
    pub wine: RawWine,
    #[serde(deserialize_with = "lenient_object")]
    pub judging: RawJudging,
    #[serde(deserialize_with = "lenient_object")]
    pub components: RawComponents,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawWine {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub style: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub vintage: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub colour: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub region: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawJudging {
    #[serde(rename = "Score")]
    pub score: Value,
    #[serde(rename = "Score100")]
    pub score100: Value,
    #[serde(rename = "Medal", deserialize_with = "lenient_string")]
    pub medal: Option<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub trophies: Vec<String>,
    #[serde(deserialize_with = "lenient_integer")]
    pub rank_in_class: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    pub panel: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub flight: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawComponents {
    pub aroma: Value,
    pub colour: Value,
    pub taste: Value,
}

// ============================================================================
// RAW SCHEMA - SPLIT INDEX + ENTRIES
// ============================================================================

/// Index document of the split variant; entries live in a separate array
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SplitIndex {
    #[serde(deserialize_with = "lenient_object")]
    pub years: BTreeMap<String, Value>,
}

/// Per-year index data. Precomputed champions and leaderboards are accepted
/// but ignored: they are always recomputed from the entries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SplitYear {
    #[serde(deserialize_with = "lenient_object")]
    pub show: ShowInfo,
    #[serde(deserialize_with = "lenient_vec")]
    pub classes: Vec<ClassInfo>,
    pub champions: Value,
    pub leaderboards: Value,
}

/// The two published results layouts, resolved once at load time
#[derive(Debug, Clone)]
pub enum ResultsDocument {
    /// `{ "<year>": { show, classes, entrants, entries } }`
    YearKeyed(BTreeMap<String, Value>),
    /// Index plus flat, already flattened entries carrying their year
    Split { index: SplitIndex, entries: Vec<Entry> },
}

/// Flat split-layout entries, one element at a time. Elements that aren't
/// objects are dropped; bad fields inside an object degrade to defaults.
pub fn parse_split_entries(value: Value) -> Vec<Entry> {
    parse_each(value, "split entry")
}

// ============================================================================
// NORMALIZED MODEL
// ============================================================================

/// A flattened, display-ready show entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entry {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_year")]
    pub year: i32,
    #[serde(deserialize_with = "lenient_string")]
    pub class_id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub class_no: String,
    #[serde(deserialize_with = "lenient_text")]
    pub class_name: String,
    /// None sorts after every numbered class
    #[serde(deserialize_with = "lenient_integer")]
    pub class_sort_order: Option<i64>,
    #[serde(deserialize_with = "lenient_text")]
    pub entry_no: String,
    #[serde(deserialize_with = "lenient_text")]
    pub winemaker: String,
    #[serde(deserialize_with = "lenient_string")]
    pub winemaker_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub entrant_club: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub wine_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub wine_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub wine_vintage: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub wine_colour: String,
    #[serde(deserialize_with = "lenient_text")]
    pub wine_region: String,
    #[serde(deserialize_with = "lenient_text")]
    pub wine_country: String,
    #[serde(deserialize_with = "lenient_score")]
    pub score: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub score100: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub medal: Option<String>,
    #[serde(deserialize_with = "lenient_score")]
    pub aroma: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub colour: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub taste: Option<f64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub best_in_class: bool,
    #[serde(alias = "champFlag", deserialize_with = "lenient_bool")]
    pub champion: bool,
    #[serde(deserialize_with = "lenient_strings")]
    pub trophies: Vec<String>,
    #[serde(deserialize_with = "lenient_integer")]
    pub rank_in_class: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    pub panel: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub flight: Option<String>,
}

impl Entry {
    /// Stable grouping key: entrant id, else lowercased winemaker name
    pub fn entrant_key(&self) -> String {
        match self.winemaker_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => format!("id:{}", id),
            None => format!("name:{}", self.winemaker.to_lowercase()),
        }
    }

    /// Medal worth displaying ("No Award" is not)
    pub fn display_medal(&self) -> Option<&str> {
        self.medal
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty() && *m != "No Award")
    }
}

/// Everything derived for one show year
#[derive(Debug, Clone, Default)]
pub struct YearData {
    pub year: i32,
    pub show: ShowInfo,
    /// Sorted by sort order, then numeric-aware code
    pub classes: Vec<ClassInfo>,
    pub entrants: HashMap<String, Entrant>,
    pub entries: Vec<Entry>,
    pub leaderboards: Leaderboards,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entrant {
    pub id: String,
    pub name: String,
    pub club: Option<String>,
}

impl YearData {
    /// Year shown to visitors; the show's own year wins over the key
    pub fn display_year(&self) -> i32 {
        self.show
            .year
            .and_then(|y| i32::try_from(y).ok())
            .unwrap_or(self.year)
    }

    pub fn class_by_id(&self, id: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.id.as_deref() == Some(id))
    }

    pub fn class_by_code(&self, code: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.code.as_deref() == Some(code))
    }

    pub fn champions(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.champion)
    }

    pub fn best_in_class(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.best_in_class)
    }
}

/// Normalized results keyed by year
#[derive(Debug, Clone, Default)]
pub struct YearCache {
    years: BTreeMap<i32, YearData>,
}

impl YearCache {
    pub fn get(&self, year: i32) -> Option<&YearData> {
        self.years.get(&year)
    }

    /// Newest first
    pub fn years(&self) -> Vec<i32> {
        self.years.keys().rev().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn insert(&mut self, data: YearData) {
        self.years.insert(data.year, data);
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

impl ResultsDocument {
    /// Builds the year cache. Malformed years are skipped with a warning.
    pub fn into_cache(self) -> YearCache {
        match self {
            ResultsDocument::YearKeyed(raw) => build_year_cache(raw),
            ResultsDocument::Split { index, entries } => build_split_cache(index, entries),
        }
    }
}

/// Normalizes the year-keyed document; non-numeric keys are ignored.
pub fn build_year_cache(raw: BTreeMap<String, Value>) -> YearCache {
    let mut cache = YearCache::default();
    for (key, payload) in raw {
        let Some(year) = parse_year_key(&key) else {
            tracing::debug!(key = %key, "ignoring non-year key");
            continue;
        };
        let payload = if payload.is_null() { Value::Object(Default::default()) } else { payload };
        match serde_json::from_value::<RawYear>(payload) {
            Ok(raw_year) => cache.insert(normalize_year(year, raw_year)),
            Err(e) => tracing::warn!(year, error = %e, "skipping malformed results year"),
        }
    }
    cache
}

/// Normalizes one year's parallel classes/entrants/entries arrays.
pub fn normalize_year(year: i32, raw: RawYear) -> YearData {
    let entrants: HashMap<String, Entrant> = raw
        .entrants
        .iter()
        .filter_map(|entrant| {
            let id = entrant.id.clone()?;
            let name = first_non_empty(&[&entrant.display_name, &entrant.name])
                .unwrap_or(UNNAMED_ENTRANT)
                .to_string();
            Some((id.clone(), Entrant { id, name, club: entrant.club.clone() }))
        })
        .collect();

    let classes_by_id: HashMap<&str, &ClassInfo> = raw
        .classes
        .iter()
        .filter_map(|c| c.id.as_deref().map(|id| (id, c)))
        .collect();

    let entries: Vec<Entry> = raw
        .entries
        .iter()
        .map(|entry| normalize_entry(year, entry, &classes_by_id, &entrants))
        .collect();

    let mut classes = raw.classes.clone();
    sort_classes(&mut classes);
    let leaderboards = compute_leaderboards(&entries);

    YearData {
        year,
        show: raw.show,
        classes,
        entrants,
        entries,
        leaderboards,
    }
}

fn normalize_entry(
    year: i32,
    raw: &RawEntry,
    classes_by_id: &HashMap<&str, &ClassInfo>,
    entrants: &HashMap<String, Entrant>,
) -> Entry {
    let class_info = raw.class_id.as_deref().and_then(|id| classes_by_id.get(id).copied());
    let entrant = raw.entrant_id.as_deref().and_then(|id| entrants.get(id));
    if raw.class_id.is_some() && class_info.is_none() {
        tracing::debug!(year, class_id = ?raw.class_id, "entry references unknown class");
    }

    let score = parse_score(&raw.judging.score);
    let score100 = parse_score(&raw.judging.score100).or(score.map(|s| s * 5.0));
    let trophies = raw.judging.trophies.clone();
    let (best_in_class, champion) = classify_trophies(&trophies);

    let wine_name = raw.wine.name.clone().unwrap_or_default();
    let wine_type = first_non_empty(&[&raw.wine.style, &raw.wine.name])
        .unwrap_or_default()
        .to_string();

    Entry {
        id: raw.id.clone(),
        year,
        class_id: raw.class_id.clone(),
        class_no: class_info.and_then(|c| c.code.clone()).unwrap_or_default(),
        class_name: class_info.and_then(|c| c.name.clone()).unwrap_or_default(),
        class_sort_order: class_info.and_then(|c| c.sort_order),
        entry_no: first_non_empty(&[&raw.exhibit_number, &raw.entry_number])
            .unwrap_or_default()
            .to_string(),
        winemaker: entrant
            .map(|e| e.name.clone())
            .unwrap_or_else(|| UNNAMED_ENTRANT.to_string()),
        winemaker_id: raw.entrant_id.clone(),
        entrant_club: entrant.and_then(|e| e.club.clone()),
        wine_name,
        wine_type,
        wine_vintage: raw.wine.vintage.clone(),
        wine_colour: raw.wine.colour.clone().unwrap_or_default(),
        wine_region: raw.wine.region.clone().unwrap_or_default(),
        wine_country: raw.wine.country.clone().unwrap_or_default(),
        score,
        score100,
        medal: raw.judging.medal.clone().filter(|m| !m.is_empty()),
        aroma: parse_score(&raw.components.aroma),
        colour: parse_score(&raw.components.colour),
        taste: parse_score(&raw.components.taste),
        best_in_class,
        champion,
        trophies,
        rank_in_class: raw.judging.rank_in_class,
        panel: raw.judging.panel.clone(),
        flight: raw.judging.flight.clone(),
    }
}

/// Resolves the split layout into the same canonical cache.
pub fn build_split_cache(index: SplitIndex, entries: Vec<Entry>) -> YearCache {
    let mut by_year: BTreeMap<i32, Vec<Entry>> = BTreeMap::new();
    for entry in entries {
        by_year.entry(entry.year).or_default().push(entry);
    }

    let mut cache = YearCache::default();
    for (key, payload) in index.years {
        let Some(year) = parse_year_key(&key) else {
            tracing::debug!(key = %key, "ignoring non-year key");
            continue;
        };
        let payload = if payload.is_null() { Value::Object(Default::default()) } else { payload };
        let split_year: SplitYear = match serde_json::from_value(payload) {
            Ok(split_year) => split_year,
            Err(e) => {
                tracing::warn!(year, error = %e, "skipping malformed index year");
                continue;
            }
        };
        let mut classes = split_year.classes;
        sort_classes(&mut classes);

        let entries: Vec<Entry> = by_year
            .remove(&year)
            .unwrap_or_default()
            .into_iter()
            .map(|entry| complete_split_entry(entry, &classes))
            .collect();
        let leaderboards = compute_leaderboards(&entries);

        cache.insert(YearData {
            year,
            show: split_year.show,
            classes,
            entrants: HashMap::new(),
            entries,
            leaderboards,
        });
    }

    for (year, orphans) in by_year {
        tracing::warn!(year, count = orphans.len(), "entries for a year missing from the index");
    }
    cache
}

/// Fills class details and trophy flags that flat entries may omit
fn complete_split_entry(mut entry: Entry, classes: &[ClassInfo]) -> Entry {
    let class_info = classes
        .iter()
        .find(|c| entry.class_id.is_some() && c.id == entry.class_id)
        .or_else(|| classes.iter().find(|c| c.code.as_deref() == Some(entry.class_no.as_str())));
    if let Some(class_info) = class_info {
        if entry.class_id.is_none() {
            entry.class_id = class_info.id.clone();
        }
        if entry.class_no.is_empty() {
            entry.class_no = class_info.code.clone().unwrap_or_default();
        }
        if entry.class_name.is_empty() {
            entry.class_name = class_info.name.clone().unwrap_or_default();
        }
        if entry.class_sort_order.is_none() {
            entry.class_sort_order = class_info.sort_order;
        }
    }
    if entry.winemaker.trim().is_empty() {
        entry.winemaker = UNNAMED_ENTRANT.to_string();
    }
    if entry.wine_type.is_empty() {
        entry.wine_type = entry.wine_name.clone();
    }
    let (best_in_class, champion) = classify_trophies(&entry.trophies);
    entry.best_in_class |= best_in_class;
    entry.champion |= champion;
    if entry.score100.is_none() {
        entry.score100 = entry.score.map(|s| s * 5.0);
    }
    entry
}

// ============================================================================
// FIELD HELPERS
// ============================================================================

/// Numeric coercion: numbers and numeric strings; anything else is None
pub fn parse_score(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// (best in class, champion) from trophy names; one entry may hold both
pub fn classify_trophies(trophies: &[String]) -> (bool, bool) {
    let lowered: Vec<String> = trophies.iter().map(|t| t.to_lowercase()).collect();
    let best_in_class = lowered.iter().any(|t| t.contains("best in class"));
    let champion = lowered.iter().any(|t| t.contains("best in show"));
    (best_in_class, champion)
}

/// Classes with a sort order first (ascending), then by numeric-aware code
pub fn sort_classes(classes: &mut [ClassInfo]) {
    classes.sort_by(|a, b| {
        let order_a = a.sort_order.unwrap_or(i64::MAX);
        let order_b = b.sort_order.unwrap_or(i64::MAX);
        order_a.cmp(&order_b).then_with(|| {
            natural_cmp(a.code.as_deref().unwrap_or(""), b.code.as_deref().unwrap_or(""))
        })
    });
}

fn parse_year_key(key: &str) -> Option<i32> {
    let digits: String = key.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn first_non_empty<'a>(values: &[&'a Option<String>]) -> Option<&'a str> {
    values
        .iter()
        .filter_map(|v| v.as_deref())
        .find(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_year() -> RawYear {
        serde_json::from_value(json!({
            "show": { "year": 2024, "edition": "49th Annual Wine Show" },
            "classes": [
                { "id": "c10", "code": "10", "name": "Fruit", "sort_order": 2 },
                { "id": "c5a", "code": "5A", "name": "Dry Red", "sort_order": 1 },
                { "id": "cx", "code": "X" }
            ],
            "entrants": [
                { "id": "e1", "display_name": "Alice Vine", "club": "SAWC" },
                { "id": "e2", "name": "Bob Cellar" }
            ],
            "entries": [
                { "id": "n1", "class_id": "c5a", "entrant_id": "e1", "exhibit_number": 12,
                  "wine": { "name": "Shiraz", "vintage": 2022 },
                  "judging": { "Score": 18.5, "Medal": "Gold", "trophies": ["Best in Class 5A", "BEST IN SHOW"] } },
                { "id": "n2", "class_id": "c10", "entrant_id": "e2", "entry_number": "3",
                  "wine": { "name": "Plum", "style": "Fruit Wine" },
                  "judging": { "Score": "16" } },
                { "id": "n3", "class_id": "missing", "entrant_id": "ghost",
                  "judging": { "Score": "n/a", "Medal": "No Award" } }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_resolves_foreign_keys() {
        let data = normalize_year(2024, sample_year());
        let first = &data.entries[0];
        assert_eq!(first.class_no, "5A");
        assert_eq!(first.class_name, "Dry Red");
        assert_eq!(first.class_sort_order, Some(1));
        assert_eq!(first.entry_no, "12");
        assert_eq!(first.winemaker, "Alice Vine");
        assert_eq!(first.entrant_club.as_deref(), Some("SAWC"));
        assert_eq!(first.wine_type, "Shiraz");
        assert_eq!(first.wine_vintage.as_deref(), Some("2022"));
        assert_eq!(first.score, Some(18.5));
        assert_eq!(first.score100, Some(92.5));
        assert!(first.best_in_class);
        assert!(first.champion);

        let second = &data.entries[1];
        assert_eq!(second.winemaker, "Bob Cellar");
        assert_eq!(second.wine_type, "Fruit Wine");
        assert_eq!(second.entry_no, "3");
        assert_eq!(second.score, Some(16.0));
    }

    #[test]
    fn test_normalize_degrades_unknown_references() {
        let data = normalize_year(2024, sample_year());
        let orphan = &data.entries[2];
        assert_eq!(orphan.class_no, "");
        assert_eq!(orphan.class_sort_order, None);
        assert_eq!(orphan.winemaker, UNNAMED_ENTRANT);
        assert_eq!(orphan.score, None);
        assert_eq!(orphan.display_medal(), None);
        assert_eq!(data.entries.len(), 3);
    }

    #[test]
    fn test_classes_sorted() {
        let data = normalize_year(2024, sample_year());
        let codes: Vec<_> = data.classes.iter().map(|c| c.code.clone().unwrap()).collect();
        assert_eq!(codes, vec!["5A", "10", "X"]);
        assert_eq!(data.class_by_code("10").unwrap().name.as_deref(), Some("Fruit"));
        assert_eq!(data.class_by_id("c5a").unwrap().code.as_deref(), Some("5A"));
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score(&json!(17)), Some(17.0));
        assert_eq!(parse_score(&json!(" 17.5 ")), Some(17.5));
        assert_eq!(parse_score(&json!("DQ")), None);
        assert_eq!(parse_score(&json!(null)), None);
        assert_eq!(parse_score(&json!("")), None);
        assert_eq!(parse_score(&json!(true)), None);
    }

    #[test]
    fn test_classify_trophies() {
        let trophies = vec!["Best in Class - Reds".to_string()];
        assert_eq!(classify_trophies(&trophies), (true, false));
        let trophies = vec!["Best In Show".to_string(), "best in class".to_string()];
        assert_eq!(classify_trophies(&trophies), (true, true));
        assert_eq!(classify_trophies(&[]), (false, false));
    }

    #[test]
    fn test_year_cache_ignores_non_year_keys() {
        let raw: BTreeMap<String, Value> = serde_json::from_value(json!({
            "2023": { "entries": [] },
            "2024": { "classes": [], "entrants": [], "entries": [] },
            "generated": "2024-10-01",
            "notes": { "entries": [] }
        }))
        .unwrap();
        let cache = build_year_cache(raw);
        assert_eq!(cache.years(), vec![2024, 2023]);
    }

    #[test]
    fn test_lenient_arrays() {
        let raw: RawYear = serde_json::from_value(json!({
            "classes": null,
            "entries": [
                "garbage",
                { "id": "ok", "judging": { "Score": 15, "trophies": "Best in Show" } }
            ]
        }))
        .unwrap();
        assert!(raw.classes.is_empty());
        assert_eq!(raw.entries.len(), 1);
        assert!(raw.entries[0].judging.trophies.is_empty());
    }

    #[test]
    fn test_split_cache_matches_canonical_shape() {
        let index: SplitIndex = serde_json::from_value(json!({
            "years": {
                "2024": {
                    "show": { "name": "Annual Show" },
                    "classes": [{ "id": "c1", "code": "1", "name": "White", "sort_order": 1 }],
                    "champions": [{ "winemaker": "precomputed" }]
                }
            }
        }))
        .unwrap();
        let entries = parse_split_entries(json!([
            { "year": 2024, "classId": "c1", "entryNo": "4", "winemaker": "Carol",
              "winemakerId": "e9", "wineName": "Riesling", "score": 17,
              "trophies": ["Best in Show"] },
            { "year": 2024, "classNo": "1", "winemaker": "", "score": null, "champFlag": false }
        ]));

        let cache = build_split_cache(index, entries);
        let data = cache.get(2024).unwrap();
        assert_eq!(data.entries.len(), 2);
        assert_eq!(data.entries[0].class_no, "1");
        assert_eq!(data.entries[0].class_name, "White");
        assert_eq!(data.entries[0].wine_type, "Riesling");
        assert!(data.entries[0].champion);
        assert_eq!(data.entries[0].score100, Some(85.0));
        assert_eq!(data.entries[1].winemaker, UNNAMED_ENTRANT);
        assert_eq!(data.entries[1].class_sort_order, Some(1));
        assert_eq!(data.champions().count(), 1);
        assert_eq!(data.leaderboards.average.len(), 1);
    }

    #[test]
    fn test_null_and_mistyped_nested_fields_keep_entry() {
        let raw: RawYear = serde_json::from_value(json!({
            "show": null,
            "classes": [{ "id": "c1", "code": 1, "name": null }],
            "entrants": [{ "id": "e1", "display_name": null, "name": "Dora" }],
            "entries": [
                { "id": "a", "class_id": "c1", "entrant_id": "e1", "wine": null, "judging": { "Score": 15 } },
                { "id": "b", "class_id": "c1", "entrant_id": "e1", "wine": { "name": "Mead" }, "judging": null },
                { "id": "c", "entrant_id": "e1", "wine": "Cider", "judging": { "Medal": 3, "trophies": null } }
            ]
        }))
        .unwrap();
        let data = normalize_year(2024, raw);
        assert_eq!(data.entries.len(), 3);
        assert_eq!(data.display_year(), 2024);

        let no_wine = &data.entries[0];
        assert_eq!(no_wine.wine_name, "");
        assert_eq!(no_wine.score, Some(15.0));
        assert_eq!(no_wine.class_no, "1");
        assert_eq!(no_wine.winemaker, "Dora");

        let no_judging = &data.entries[1];
        assert_eq!(no_judging.wine_name, "Mead");
        assert_eq!(no_judging.score, None);
        assert_eq!(no_judging.medal, None);

        assert_eq!(data.entries[2].wine_name, "");
        assert_eq!(data.entries[2].medal.as_deref(), Some("3"));
    }

    #[test]
    fn test_split_entries_degrade_per_record() {
        let entries = parse_split_entries(json!([
            { "year": 2024, "classNo": "1", "winemaker": "Carol", "score": 17 },
            { "year": "2024", "classNo": 1, "winemaker": "Dan", "score": "n/a", "wineVintage": 2022,
              "trophies": "Best in Show", "bestInClass": null },
            "garbage",
            null
        ]));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].year, 2024);
        assert_eq!(entries[1].class_no, "1");
        assert_eq!(entries[1].score, None);
        assert_eq!(entries[1].wine_vintage.as_deref(), Some("2022"));
        assert!(entries[1].trophies.is_empty());
        assert!(!entries[1].best_in_class);
    }

    #[test]
    fn test_split_entry_gets_class_id_from_code() {
        let index: SplitIndex = serde_json::from_value(json!({
            "years": { "2024": { "classes": [{ "id": "c1", "code": "1", "name": "White" }] } }
        }))
        .unwrap();
        let entries = parse_split_entries(json!([
            { "year": 2024, "classNo": "1", "winemaker": "Carol", "score": 18,
              "trophies": ["Best in Class 1"] }
        ]));
        let cache = build_split_cache(index, entries);
        let data = cache.get(2024).unwrap();
        let winner = data.best_in_class().next().unwrap();
        assert_eq!(winner.class_id.as_deref(), Some("c1"));
    }
}
