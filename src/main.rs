//! # News Curator
//!
//! A daily pipeline that picks English-language news stories worth
//! translating and posts the shortlist to a chat channel.
//!
//! ## Usage
//!
//! ```sh
//! news_curator fetch     # NYT Top Stories + Bloomberg/Economist feeds -> /tmp/today_articles.json
//! news_curator select    # language model shortlist                    -> /tmp/selected.json
//! news_curator post      # shortlist -> chat webhook
//! news_curator run       # all three, stopping at the first failure
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: one request per NYT section and per feed, normalized into [`models::ArticleRecord`]
//! 2. **Selecting**: one model call with the editable prompt and the numbered article list
//! 3. **Posting**: one webhook POST with the rendered shortlist
//!
//! Stages hand off through JSON files and keep no other state. Each is meant
//! to be run by an external scheduler once a day.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod sources;
mod stages;
mod utils;

use cli::{Cli, Command};
use error::PipelineError;
use stages::post::Payload;

async fn dispatch(command: Command) -> Result<(), PipelineError> {
    match command {
        Command::Fetch { output, options } => {
            let batch = stages::fetch::run(&options, &output).await?;
            info!(articles = batch.total_count, path = %output.display(), "Article list written");
        }
        Command::Select {
            input,
            output,
            options,
        } => {
            let result = stages::select::run(&options, &input, &output).await?;
            info!(selected = result.selected.len(), path = %output.display(), "Shortlist written");
        }
        Command::Post {
            input,
            message,
            error,
            options,
        } => {
            let payload = match (error.as_deref(), message.as_deref()) {
                (Some(text), _) => Payload::Failure(text),
                (None, Some(text)) => Payload::Message(text),
                (None, None) => Payload::Selection(&input),
            };
            stages::post::run(&options, payload).await?;
        }
        Command::Run {
            articles,
            selection,
            fetch,
            select,
            post,
        } => {
            stages::run_all(&fetch, &select, &post, &articles, &selection).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "news_curator starting up");
    let args = Cli::parse();

    match dispatch(args.command).await {
        Ok(()) => {
            let elapsed = start_time.elapsed();
            info!(?elapsed, "Execution complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Execution failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
