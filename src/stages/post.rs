//! Poster stage: deliver one message to the chat webhook.

use crate::cli::PostOptions;
use crate::config::{SLACK_WEBHOOK_URL, require};
use crate::error::{PipelineError, PostError};
use crate::models::SelectionResult;
use crate::outputs::json::read_artifact;
use crate::outputs::slack::{fit_message, render_error, render_selection};
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde_json::json;
use std::path::Path;
use tracing::{info, instrument, warn};

const STAGE: &str = "post";

/// What the Poster should send.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// Render the shortlist artifact at this path.
    Selection(&'a Path),
    /// Send this text as-is.
    Message(&'a str),
    /// Send a failure notice wrapping this text.
    Failure(&'a str),
}

/// POST `{"text": text}` to the webhook.
///
/// # Returns
///
/// `Ok(())` for any 2xx status, otherwise a [`PostError`] carrying the status
/// and response body.
#[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
pub async fn send_webhook(client: &Client, webhook_url: &str, text: &str) -> Result<(), PostError> {
    let response = client
        .post(webhook_url)
        .json(&json!({ "text": text }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PostError::Status {
            status,
            body: truncate_for_log(&body, 300),
        });
    }
    info!(%status, "Webhook accepted message");
    Ok(())
}

/// Run the Poster.
///
/// # Arguments
///
/// * `options` - Webhook settings; `SLACK_WEBHOOK_URL` must be set
/// * `payload` - Selection artifact to render, a free-form message, or a
///   failure notice
///
/// # Returns
///
/// The text that was sent, or `None` when a blank `--message` left nothing to
/// post. Errors carry the `post` stage name.
#[instrument(level = "info", skip_all)]
pub async fn run(options: &PostOptions, payload: Payload<'_>) -> Result<Option<String>, PipelineError> {
    let webhook_url = require(options.webhook_url.as_deref(), SLACK_WEBHOOK_URL)
        .map_err(|e| PipelineError::config(STAGE, e))?;

    let text = match payload {
        Payload::Selection(path) => {
            let result: SelectionResult = read_artifact(path)
                .await
                .map_err(|e| PipelineError::artifact(STAGE, e))?;
            info!(path = %path.display(), selected = result.selected.len(), "Loaded shortlist");
            render_selection(&result)
        }
        Payload::Message(text) => text.to_string(),
        Payload::Failure(text) => render_error(text),
    };

    if text.trim().is_empty() {
        warn!("Message is empty; nothing to post");
        return Ok(None);
    }

    let text = fit_message(text);
    send_webhook(&Client::new(), webhook_url, &text).await?;
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::models::fixtures::record;
    use crate::models::Selection;
    use crate::outputs::json::write_artifact;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(url: Option<String>) -> PostOptions {
        PostOptions { webhook_url: url }
    }

    #[tokio::test]
    async fn test_posts_rendered_selection() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("selected.json");
        let result = SelectionResult {
            selected_at: Utc.with_ymd_and_hms(2026, 10, 18, 7, 0, 0).unwrap(),
            model: "m".to_string(),
            selected: vec![Selection {
                article: record(Source::Economist, 4),
                reason: "Clear explainer".to_string(),
            }],
        };
        write_artifact(&result, &input).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(json!({ "text": render_selection(&result) })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let sent = run(
            &options(Some(format!("{}/hook", server.uri()))),
            Payload::Selection(&input),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(sent.contains("Clear explainer"));
    }

    #[tokio::test]
    async fn test_missing_webhook_fails_before_network() {
        let dir = TempDir::new().unwrap();
        let err = run(&options(None), Payload::Selection(&dir.path().join("selected.json")))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "post stage failed: required environment variable SLACK_WEBHOOK_URL is not set"
        );
    }

    #[tokio::test]
    async fn test_rejected_payload_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_payload"))
            .expect(1)
            .mount(&server)
            .await;

        let err = run(&options(Some(server.uri())), Payload::Message("hello"))
            .await
            .unwrap_err();
        match err {
            PipelineError::Post(PostError::Status { status, body }) => {
                assert_eq!(status.as_u16(), 400);
                assert_eq!(body, "invalid_payload");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failure_notice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({ "text": render_error("boom") })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sent = run(&options(Some(server.uri())), Payload::Failure("boom"))
            .await
            .unwrap();
        assert!(sent.unwrap().starts_with(":rotating_light:"));
    }

    #[tokio::test]
    async fn test_blank_message_is_not_posted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sent = run(&options(Some(server.uri())), Payload::Message("  \n"))
            .await
            .unwrap();
        assert_eq!(sent, None);
    }
}
