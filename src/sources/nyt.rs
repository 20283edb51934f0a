//! New York Times Top Stories API.
//!
//! One authenticated GET per section:
//! `{base}/svc/topstories/v2/{section}.json?api-key=KEY`. Each entry of the
//! `results` array becomes one [`ArticleRecord`] with its fields copied as-is.

use crate::error::FetchError;
use crate::models::{ArticleRecord, Source};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.nytimes.com";

#[derive(Debug, Deserialize)]
struct TopStories {
    #[serde(default)]
    results: Vec<TopStory>,
}

#[derive(Debug, Deserialize)]
struct TopStory {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default, rename = "abstract")]
    summary: String,
    #[serde(default)]
    published_date: String,
}

impl TopStory {
    fn into_record(self, section: &str) -> ArticleRecord {
        let published_at = DateTime::parse_from_rfc3339(&self.published_date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
        ArticleRecord {
            title: self.title,
            url: self.url,
            summary: self.summary,
            source: Source::Nyt,
            section: section.to_string(),
            published_at,
        }
    }
}

/// Turn a Top Stories response body into records, one per `results` entry.
pub fn parse_top_stories(body: &str, section: &str) -> Result<Vec<ArticleRecord>, serde_json::Error> {
    let stories: TopStories = serde_json::from_str(body)?;
    Ok(stories
        .results
        .into_iter()
        .map(|story| story.into_record(section))
        .collect())
}

/// Fetch every configured section, in order.
///
/// Sends one `GET {base_url}/svc/topstories/v2/{section}.json` per section and
/// maps every story in the response onto an [`ArticleRecord`].
///
/// # Arguments
///
/// * `client` - Shared HTTP client
/// * `base_url` - API root, overridable for tests
/// * `api_key` - Value of `NYT_API_KEY`
/// * `sections` - Section names, fetched in this order
///
/// # Returns
///
/// The records of all sections concatenated, or the error of the first
/// section that failed. A failing section aborts the whole source.
#[instrument(level = "info", skip(client, api_key))]
pub async fn fetch_sections(
    client: &Client,
    base_url: &str,
    api_key: &str,
    sections: &[String],
) -> Result<Vec<ArticleRecord>, FetchError> {
    let mut articles = Vec::new();
    for section in sections {
        let mut batch = fetch_section(client, base_url, api_key, section).await?;
        articles.append(&mut batch);
    }
    info!(count = articles.len(), "Fetched NYT top stories");
    Ok(articles)
}

#[instrument(level = "info", skip(client, base_url, api_key))]
async fn fetch_section(
    client: &Client,
    base_url: &str,
    api_key: &str,
    section: &str,
) -> Result<Vec<ArticleRecord>, FetchError> {
    let origin = format!("{}/{}", Source::Nyt, section);
    let url = format!(
        "{}/svc/topstories/v2/{}.json",
        base_url.trim_end_matches('/'),
        section
    );

    let response = client
        .get(&url)
        .query(&[("api-key", api_key)])
        .send()
        .await
        .map_err(|error| FetchError::Request {
            origin: origin.clone(),
            error,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { origin, status });
    }

    let body = response.text().await.map_err(|error| FetchError::Decode {
        origin: origin.clone(),
        error,
    })?;
    let articles = parse_top_stories(&body, section).map_err(|e| FetchError::Feed {
        origin,
        reason: e.to_string(),
    })?;

    debug!(count = articles.len(), "Parsed NYT section");
    Ok(articles)
}
