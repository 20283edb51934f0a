//! The three pipeline stages and the chain that runs them in order.
//!
//! | Stage    | Module     | Reads             | Writes            |
//! |----------|------------|-------------------|-------------------|
//! | Fetcher  | [`fetch`]  | sources, NYT key  | articles artifact |
//! | Selector | [`select`] | articles artifact | selection artifact |
//! | Poster   | [`post`]   | selection artifact | webhook message   |

pub mod fetch;
pub mod post;
pub mod select;

use crate::cli::{FetchOptions, PostOptions, SelectOptions};
use crate::error::PipelineError;
use std::path::Path;
use tracing::{info, instrument};

/// Run fetch, select and post in one process. The first failure stops the chain.
#[instrument(level = "info", skip_all)]
pub async fn run_all(
    fetch_options: &FetchOptions,
    select_options: &SelectOptions,
    post_options: &PostOptions,
    articles: &Path,
    selection: &Path,
) -> Result<(), PipelineError> {
    let batch = fetch::run(fetch_options, articles).await?;
    info!(articles = batch.total_count, "Fetch stage complete");

    let result = select::run(select_options, articles, selection).await?;
    info!(selected = result.selected.len(), "Select stage complete");

    post::run(post_options, post::Payload::Selection(selection)).await?;
    info!("Post stage complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedConfig, SourcesConfig};
    use crate::models::{SelectionResult, Source};
    use crate::outputs::json::read_artifact;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BLOOMBERG_FEED: &str = "<rss><channel><item>\
        <title>Yen Slides as BOJ Holds Rates</title>\
        <link>https://www.bloomberg.com/news/articles/yen-slides</link>\
        <description>The currency weakened.</description>\
        </item></channel></rss>";

    const EMPTY_FEED: &str = "<rss><channel><title>Bloomberg Markets</title></channel></rss>";

    struct Fixture {
        server: MockServer,
        dir: TempDir,
    }

    impl Fixture {
        /// Two NYT stories, one Bloomberg story, and a model answering `model_reply`.
        async fn new(model_reply: &str) -> Self {
            let now = chrono::Utc::now().to_rfc3339();
            let stories = json!([
                {"title": "Chip Exports Tighten", "url": "https://www.nytimes.com/chips.html",
                 "abstract": "New rules.", "published_date": now},
                {"title": "Harvest Festival Opens", "url": "https://www.nytimes.com/harvest.html",
                 "abstract": "Crowds gather.", "published_date": now}
            ]);
            Self::with_sources(stories, BLOOMBERG_FEED, model_reply).await
        }

        /// Every source answers successfully with nothing in it.
        async fn empty() -> Self {
            Self::with_sources(json!([]), EMPTY_FEED, r#"{"selected": []}"#).await
        }

        async fn with_sources(nyt_results: Value, feed: &str, model_reply: &str) -> Self {
            let server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/svc/topstories/v2/business.json"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({ "results": nyt_results })),
                )
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/markets/news.rss"))
                .respond_with(ResponseTemplate::new(200).set_body_string(feed))
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/v1/messages"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "content": [{"type": "text", "text": model_reply}],
                    "stop_reason": "end_turn"
                })))
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/hook"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;

            Self {
                server,
                dir: TempDir::new().unwrap(),
            }
        }

        fn options(&self) -> (FetchOptions, SelectOptions, PostOptions) {
            let sources = SourcesConfig {
                nyt_sections: vec!["business".to_string()],
                feeds: vec![FeedConfig {
                    source: Source::Bloomberg,
                    section: "markets".to_string(),
                    url: format!("{}/markets/news.rss", self.server.uri()),
                }],
            };
            let sources_path = self.dir.path().join("sources.yaml");
            std::fs::write(&sources_path, serde_yaml::to_string(&sources).unwrap()).unwrap();

            (
                FetchOptions {
                    hours: 48,
                    sources: Some(sources_path),
                    nyt_api_key: Some("nyt-key".to_string()),
                    nyt_base_url: self.server.uri(),
                },
                SelectOptions {
                    prompt: None,
                    anthropic_api_key: Some("model-key".to_string()),
                    model: "claude-test".to_string(),
                    anthropic_api_url: format!("{}/v1/messages", self.server.uri()),
                    max_tokens: 1024,
                },
                PostOptions {
                    webhook_url: Some(format!("{}/hook", self.server.uri())),
                },
            )
        }

        async fn model_calls(&self) -> usize {
            let requests = self.server.received_requests().await.unwrap_or_default();
            requests
                .iter()
                .filter(|r| r.url.path() == "/v1/messages")
                .count()
        }

        async fn posted_text(&self) -> Option<String> {
            let requests = self.server.received_requests().await.unwrap_or_default();
            requests
                .iter()
                .filter(|r| r.url.path() == "/hook")
                .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
                .find_map(|body| body["text"].as_str().map(str::to_string))
        }
    }

    #[tokio::test]
    async fn test_three_articles_one_selected() {
        let fixture = Fixture::new(
            r#"{"selected": [{"index": 1, "url": "https://www.nytimes.com/chips.html", "reason": "Explains the new export rules for Japanese suppliers"}]}"#,
        )
        .await;
        let (fetch, select, post) = fixture.options();
        let articles = fixture.dir.path().join("articles.json");
        let selection = fixture.dir.path().join("selected.json");

        run_all(&fetch, &select, &post, &articles, &selection)
            .await
            .unwrap();

        let result: SelectionResult = read_artifact(&selection).await.unwrap();
        assert_eq!(result.selected.len(), 1);
        assert_eq!(result.model, "claude-test");

        let text = fixture.posted_text().await.expect("webhook was called");
        assert!(text.contains("Chip Exports Tighten"));
        assert!(text.contains("https://www.nytimes.com/chips.html"));
        assert!(text.contains("Explains the new export rules for Japanese suppliers"));
        assert!(!text.contains("Harvest Festival Opens"));
        assert!(!text.contains("Yen Slides as BOJ Holds Rates"));
    }

    #[tokio::test]
    async fn test_bad_model_reply_stops_before_posting() {
        let fixture = Fixture::new(
            r#"{"selected": [{"url": "https://www.nytimes.com/invented.html", "reason": "Not real"}]}"#,
        )
        .await;
        let (fetch, select, post) = fixture.options();
        let articles = fixture.dir.path().join("articles.json");
        let selection = fixture.dir.path().join("selected.json");

        let err = run_all(&fetch, &select, &post, &articles, &selection)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Selection(_)));
        assert!(articles.exists());
        assert!(!selection.exists());
        assert_eq!(fixture.posted_text().await, None);
    }

    #[tokio::test]
    async fn test_no_articles_posts_notice_without_model_call() {
        let fixture = Fixture::empty().await;
        let (fetch, select, post) = fixture.options();
        let articles = fixture.dir.path().join("articles.json");
        let selection = fixture.dir.path().join("selected.json");

        run_all(&fetch, &select, &post, &articles, &selection)
            .await
            .unwrap();

        assert_eq!(fixture.model_calls().await, 0);
        let result: SelectionResult = read_artifact(&selection).await.unwrap();
        assert!(result.is_empty());

        let text = fixture.posted_text().await.expect("webhook was called");
        assert!(text.starts_with(":warning:"), "unexpected message: {text}");
        assert!(text.contains("No articles were selected"));
    }
}
