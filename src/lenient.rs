//! Forgiving `deserialize_with` helpers for published JSON.
//!
//! Hand-maintained data files carry nulls, numbers where strings belong and
//! the odd stray value. A bad field degrades to its default instead of
//! failing the record it sits in.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::results::parse_score;

/// Strings, numbers and booleans as text; anything else is None
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value))
}

/// Like `lenient_string`, with an empty string for anything unusable
pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).unwrap_or_default())
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn lenient_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Year field; unusable values become 0, which matches no index year
pub fn lenient_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let year = lenient_integer(deserializer)?;
    Ok(year.and_then(|y| i32::try_from(y).ok()).unwrap_or_default())
}

/// Numbers and numeric strings; see `parse_score`
pub fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_score(&value))
}

/// `true`, "true"/"yes"/"1" and non-zero numbers
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    })
}

/// Non-arrays become empty; elements that don't fit are dropped
pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_each(value, "record"))
}

/// String elements of an array; everything else is dropped
pub fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

/// Nested objects; null, scalars and objects that still don't fit become
/// the default
pub fn lenient_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "replacing malformed object with defaults");
        T::default()
    }))
}

/// Parses each element of an array on its own, logging and dropping the
/// ones that don't fit. Non-arrays yield nothing.
pub fn parse_each<T: DeserializeOwned>(value: Value, what: &str) -> Vec<T> {
    let Value::Array(items) = value else {
        if !value.is_null() {
            tracing::warn!(what, "expected an array");
        }
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(what, index, error = %e, "dropping malformed element");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Inner {
        #[serde(deserialize_with = "lenient_string")]
        name: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Outer {
        #[serde(deserialize_with = "lenient_object")]
        inner: Inner,
        #[serde(deserialize_with = "lenient_text")]
        title: String,
        #[serde(deserialize_with = "lenient_score")]
        score: Option<f64>,
        #[serde(deserialize_with = "lenient_bool")]
        flag: bool,
        #[serde(deserialize_with = "lenient_strings")]
        tags: Vec<String>,
        #[serde(deserialize_with = "lenient_year")]
        year: i32,
    }

    #[test]
    fn test_nulls_and_wrong_types_degrade() {
        let outer: Outer = serde_json::from_value(json!({
            "inner": null,
            "title": null,
            "score": "n/a",
            "flag": "yes",
            "tags": ["Best in Show", 3, null],
            "year": "2024"
        }))
        .unwrap();
        assert!(outer.inner.name.is_none());
        assert_eq!(outer.title, "");
        assert_eq!(outer.score, None);
        assert!(outer.flag);
        assert_eq!(outer.tags, vec!["Best in Show"]);
        assert_eq!(outer.year, 2024);
    }

    #[test]
    fn test_numbers_become_text() {
        let outer: Outer = serde_json::from_value(json!({ "inner": { "name": 3 }, "title": 12 })).unwrap();
        assert_eq!(outer.inner.name.as_deref(), Some("3"));
        assert_eq!(outer.title, "12");
    }

    #[test]
    fn test_parse_each_drops_bad_elements() {
        let parsed: Vec<Outer> = parse_each(json!([{ "title": "ok" }, "garbage", 7]), "outer");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "ok");
        assert!(parse_each::<Outer>(json!({ "not": "an array" }), "outer").is_empty());
    }
}
