//! Selector stage: ask the model for a shortlist.
//!
//! The editable prompt file carries the editorial criteria and is sent as the
//! system prompt. The user message carries the numbered article list and a
//! fixed reply contract:
//!
//! ```json
//! {"selected": [{"index": 3, "url": "https://...", "reason": "..."}]}
//! ```
//!
//! The reply is parsed strictly. Anything that does not match the contract,
//! or that points at an article we did not send, fails the stage instead of
//! being posted.

use crate::api::{AnthropicClient, AskAsync};
use crate::cli::SelectOptions;
use crate::config::{ANTHROPIC_API_KEY, read_text, require};
use crate::error::{ConfigError, PipelineError, SelectionError};
use crate::models::{ArticleBatch, Selection, SelectionResult};
use crate::outputs::json::{read_artifact, write_artifact};
use crate::utils::{looks_truncated, truncate_for_log};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

const STAGE: &str = "select";

/// Editorial criteria used when no prompt file is given.
pub const DEFAULT_PROMPT: &str = include_str!("../../prompts/select_articles.txt");

const REPLY_CONTRACT: &str = r#"## Response format
Reply with a single JSON object and nothing else:
{"selected": [{"index": <article number>, "url": "<article URL>", "reason": "<why this article is worth translating>"}]}
Only use articles from the list above, copying their number and URL exactly.
Reply with {"selected": []} if no article qualifies."#;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct ModelReply {
    selected: Vec<ModelPick>,
}

#[derive(Debug, Deserialize)]
struct ModelPick {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    reason: String,
}

/// Build the user message: date, numbered article list, reply contract.
pub fn build_user_message(batch: &ArticleBatch, today: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Choose articles from the list below according to the selection criteria.\n\
         Today's date is {}.\n",
        today.format("%Y-%m-%d")
    );
    let _ = writeln!(out, "## Article list ({} articles)\n", batch.articles.len());

    for (i, article) in batch.articles.iter().enumerate() {
        let published = article
            .published_at
            .map(|p| p.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        let section: &str = if article.section.is_empty() {
            "unknown"
        } else {
            &article.section
        };
        let summary: &str = if article.summary.is_empty() {
            "none"
        } else {
            &article.summary
        };
        let _ = writeln!(out, "### {}. {}", i + 1, article.title);
        let _ = writeln!(out, "- Source: {}", article.source);
        let _ = writeln!(out, "- Section: {section}");
        let _ = writeln!(out, "- Published: {published}");
        let _ = writeln!(out, "- URL: {}", article.url);
        let _ = writeln!(out, "- Summary: {summary}\n");
    }

    out.push_str(REPLY_CONTRACT);
    out
}

fn malformed(e: serde_json::Error) -> SelectionError {
    let reason = if looks_truncated(&e) {
        format!("reply was cut off before the JSON ended ({e})")
    } else {
        format!("reply does not match the expected shape ({e})")
    };
    SelectionError::Malformed { reason }
}

/// Parse the reply object, which may be wrapped in prose or a code fence.
///
/// Without a fence, the first `{` that starts a complete reply object wins and
/// anything after that object is ignored. When no candidate parses, the error
/// from the first one is reported, so a reply cut off mid-object reads as
/// truncated.
fn parse_reply(text: &str) -> Result<ModelReply, SelectionError> {
    if let Some(m) = FENCED_JSON.captures(text).and_then(|c| c.get(1)) {
        return serde_json::from_str(m.as_str()).map_err(malformed);
    }

    let mut first_error = None;
    for (start, _) in text.match_indices('{') {
        let mut values =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<ModelReply>();
        match values.next() {
            Some(Ok(reply)) => return Ok(reply),
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }

    Err(match first_error {
        Some(e) => malformed(e),
        None => SelectionError::Malformed {
            reason: format!("no JSON object in reply: {}", truncate_for_log(text, 200)),
        },
    })
}

/// Map every pick back onto the input batch.
///
/// A URL takes precedence over an index when both are present. Repeated picks
/// of the same article keep the first reason.
///
/// # Arguments
///
/// * `text` - Raw model reply, optionally wrapped in prose or a code fence
/// * `batch` - The articles that were offered to the model
///
/// # Returns
///
/// One [`Selection`] per distinct article, in reply order, or
/// [`SelectionError::Malformed`] / [`SelectionError::UnknownArticle`] when any
/// pick does not fit the contract.
pub fn resolve_reply(text: &str, batch: &ArticleBatch) -> Result<Vec<Selection>, SelectionError> {
    let reply = parse_reply(text)?;
    let mut selections = Vec::with_capacity(reply.selected.len());

    for pick in reply.selected {
        let reason = pick.reason.trim();
        if reason.is_empty() {
            return Err(SelectionError::Malformed {
                reason: "a pick has no reason".to_string(),
            });
        }
        let url = pick.url.as_deref().map(str::trim).filter(|u| !u.is_empty());
        let article = match (url, pick.index) {
            (Some(url), _) => batch
                .find_by_url(url)
                .ok_or_else(|| SelectionError::UnknownArticle {
                    reference: url.to_string(),
                })?,
            (None, Some(index)) => {
                batch
                    .find_by_index(index)
                    .ok_or_else(|| SelectionError::UnknownArticle {
                        reference: format!("article #{index}"),
                    })?
            }
            (None, None) => {
                return Err(SelectionError::Malformed {
                    reason: "a pick has neither url nor index".to_string(),
                });
            }
        };
        selections.push(Selection {
            article: article.clone(),
            reason: reason.to_string(),
        });
    }

    Ok(selections
        .into_iter()
        .unique_by(|s| s.article.url.clone())
        .collect())
}

/// Shortlist `batch` with `model`. An empty batch never reaches the model.
#[instrument(level = "info", skip_all, fields(articles = batch.articles.len()))]
pub async fn select_articles<A: AskAsync>(
    model: &A,
    prompt: &str,
    batch: &ArticleBatch,
    now: DateTime<Utc>,
) -> Result<SelectionResult, SelectionError> {
    if batch.articles.is_empty() {
        warn!("No articles to choose from; skipping model call");
        return Ok(SelectionResult::empty(now));
    }

    let user = build_user_message(batch, now);
    debug!(chars = user.len(), "Built selection request");
    let reply = model.ask(prompt, &user).await?;

    let selected = resolve_reply(&reply, batch).inspect_err(|e| {
        warn!(error = %e, reply = %truncate_for_log(&reply, 300), "Rejected model reply");
    })?;
    info!(selected = selected.len(), "Model shortlisted articles");

    Ok(SelectionResult {
        selected_at: now,
        model: model.model().to_string(),
        selected,
    })
}

async fn load_prompt(path: Option<&Path>) -> Result<String, ConfigError> {
    match path {
        Some(path) => read_text(path).await,
        None => Ok(DEFAULT_PROMPT.to_string()),
    }
}

/// Run the Selector: read `input`, call the model, write `output`.
///
/// # Arguments
///
/// * `options` - Prompt file, Anthropic key, model, endpoint and token limit
/// * `input` - Article list written by the Fetcher
/// * `output` - Path of the selection artifact
///
/// # Returns
///
/// The selection that was written. A missing key, unreadable input or prompt,
/// failed model call, or rejected reply fails the stage and leaves `output`
/// untouched.
#[instrument(level = "info", skip_all, fields(input = %input.display(), output = %output.display()))]
pub async fn run(
    options: &SelectOptions,
    input: &Path,
    output: &Path,
) -> Result<SelectionResult, PipelineError> {
    let api_key = require(options.anthropic_api_key.as_deref(), ANTHROPIC_API_KEY)
        .map_err(|e| PipelineError::config(STAGE, e))?;
    let batch: ArticleBatch = read_artifact(input)
        .await
        .map_err(|e| PipelineError::artifact(STAGE, e))?;
    let prompt = load_prompt(options.prompt.as_deref())
        .await
        .map_err(|e| PipelineError::config(STAGE, e))?;
    info!(articles = batch.articles.len(), "Loaded article list");

    let model = AnthropicClient::new(
        Client::new(),
        &options.anthropic_api_url,
        api_key,
        &options.model,
        options.max_tokens,
    );
    let result = select_articles(&model, &prompt, &batch, Utc::now()).await?;

    write_artifact(&result, output)
        .await
        .map_err(|e| PipelineError::artifact(STAGE, e))?;
    Ok(result)
}
