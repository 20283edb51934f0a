//! Fetcher stage: collect articles from every configured source.
//!
//! NYT sections first, then feeds in configuration order. Any source that
//! fails aborts the stage. The combined list is filtered to the recency
//! window, deduplicated by URL, and written as an [`ArticleBatch`].

use crate::cli::FetchOptions;
use crate::config::{NYT_API_KEY, SourcesConfig, require};
use crate::error::PipelineError;
use crate::models::{ArticleBatch, ArticleRecord};
use crate::outputs::json::write_artifact;
use crate::sources::{nyt, rss};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use reqwest::Client;
use std::path::Path;
use tracing::{debug, info, instrument};

const STAGE: &str = "fetch";

/// Drop articles published before `now - hours`. Undated articles are kept.
///
/// A window reaching past the earliest representable date keeps everything.
pub fn filter_recent(
    articles: Vec<ArticleRecord>,
    now: DateTime<Utc>,
    hours: u32,
) -> Vec<ArticleRecord> {
    let Some(cutoff) =
        Duration::try_hours(i64::from(hours)).and_then(|window| now.checked_sub_signed(window))
    else {
        debug!(hours, "Recency window exceeds the calendar; keeping every article");
        return articles;
    };
    articles
        .into_iter()
        .filter(|a| a.published_at.is_none_or(|published| published >= cutoff))
        .collect()
}

/// Keep the first article for each URL; drop articles without one.
pub fn dedupe_by_url(articles: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    articles
        .into_iter()
        .filter(|a| !a.url.is_empty())
        .unique_by(|a| a.url.clone())
        .collect()
}

/// Run the Fetcher and write its artifact to `output`.
///
/// NYT sections are fetched first, then each feed in configuration order.
///
/// # Arguments
///
/// * `options` - Recency window, sources file, NYT key and API root
/// * `output` - Path of the article list artifact
///
/// # Returns
///
/// The batch that was written. A missing `NYT_API_KEY` fails before any
/// request; any failing source fails the stage and nothing is written.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub async fn run(options: &FetchOptions, output: &Path) -> Result<ArticleBatch, PipelineError> {
    let api_key = require(options.nyt_api_key.as_deref(), NYT_API_KEY)
        .map_err(|e| PipelineError::config(STAGE, e))?;
    let sources = SourcesConfig::load(options.sources.as_deref())
        .await
        .map_err(|e| PipelineError::config(STAGE, e))?;

    let client = Client::new();
    let mut articles =
        nyt::fetch_sections(&client, &options.nyt_base_url, api_key, &sources.nyt_sections)
            .await?;
    for feed in &sources.feeds {
        articles.extend(rss::fetch_feed(&client, feed).await?);
    }
    let fetched = articles.len();

    let now = Utc::now();
    let recent = filter_recent(articles, now, options.hours);
    let within_window = recent.len();
    let unique = dedupe_by_url(recent);

    info!(
        fetched,
        within_window,
        unique = unique.len(),
        hours = options.hours,
        "Collected articles"
    );

    let batch = ArticleBatch::new(now, unique);
    write_artifact(&batch, output)
        .await
        .map_err(|e| PipelineError::artifact(STAGE, e))?;
    Ok(batch)
}
