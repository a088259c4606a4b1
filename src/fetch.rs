use reqwest::header::CACHE_CONTROL;
use serde::de::DeserializeOwned;

use crate::error::{Result, SiteError};

/// True when the source should be fetched over HTTP rather than read from disk
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Fetches a document body with a single uncached GET, or reads it from disk
pub async fn fetch_text(source: &str) -> Result<String> {
    if !is_remote(source) {
        tracing::debug!(path = source, "reading local document");
        return Ok(tokio::fs::read_to_string(source).await?);
    }

    tracing::debug!(url = source, "fetching document");
    let client = reqwest::Client::new();
    let response = client
        .get(source)
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SiteError::Status {
            status: status.as_u16(),
            url: source.to_string(),
        });
    }
    Ok(response.text().await?)
}

/// Fetches and deserializes a JSON document
pub async fn fetch_json<T: DeserializeOwned>(source: &str) -> Result<T> {
    let body = fetch_text(source).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Fetches two JSON documents concurrently; the first failure aborts both
pub async fn fetch_json_pair<A, B>(first: &str, second: &str) -> Result<(A, B)>
where
    A: DeserializeOwned,
    B: DeserializeOwned,
{
    futures::try_join!(fetch_json::<A>(first), fetch_json::<B>(second))
}
