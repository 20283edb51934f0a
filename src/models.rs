//! Data models handed between the pipeline stages.
//!
//! - [`ArticleRecord`]: one normalized article from any source
//! - [`ArticleBatch`]: the Fetcher's artifact
//! - [`SelectionResult`]: the Selector's artifact, a shortlist of records with reasons
//!
//! Both artifacts are plain JSON files; see [`crate::outputs::json`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an article came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Source {
    #[serde(rename = "NYT")]
    Nyt,
    Bloomberg,
    Economist,
    Guardian,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Nyt => "NYT",
            Source::Bloomberg => "Bloomberg",
            Source::Economist => "Economist",
            Source::Guardian => "Guardian",
        };
        f.write_str(name)
    }
}

/// A single article, normalized from the NYT API or a feed entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    /// Abstract or feed description with markup removed. May be empty.
    #[serde(default)]
    pub summary: String,
    pub source: Source,
    /// Section the article was listed under (e.g. "technology"). May be empty.
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Everything the Fetcher collected in one run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleBatch {
    pub fetched_at: DateTime<Utc>,
    pub total_count: usize,
    pub articles: Vec<ArticleRecord>,
}

impl ArticleBatch {
    pub fn new(fetched_at: DateTime<Utc>, articles: Vec<ArticleRecord>) -> Self {
        Self {
            fetched_at,
            total_count: articles.len(),
            articles,
        }
    }

    /// Look up an article by exact URL.
    pub fn find_by_url(&self, url: &str) -> Option<&ArticleRecord> {
        self.articles.iter().find(|a| a.url == url)
    }

    /// Look up an article by its 1-based position, as numbered in the prompt.
    pub fn find_by_index(&self, index: usize) -> Option<&ArticleRecord> {
        index.checked_sub(1).and_then(|i| self.articles.get(i))
    }
}

/// One shortlisted article and why the model picked it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Selection {
    pub article: ArticleRecord,
    pub reason: String,
}

/// The Selector's output.
///
/// Every `article` is a copy of a record from the input [`ArticleBatch`];
/// the Selector never writes a record it did not receive.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SelectionResult {
    pub selected_at: DateTime<Utc>,
    /// Model that produced the shortlist; empty when no model call was made.
    #[serde(default)]
    pub model: String,
    pub selected: Vec<Selection>,
}

impl SelectionResult {
    pub fn empty(selected_at: DateTime<Utc>) -> Self {
        Self {
            selected_at,
            model: String::new(),
            selected: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
