//! Command-line interface definitions for News Curator.
//!
//! Each pipeline stage is its own subcommand so the scheduler can run them as
//! separate processes; `run` chains all three. Credentials and endpoints can
//! be given as flags or environment variables.

use crate::api::{DEFAULT_API_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::outputs::json::{DEFAULT_ARTICLES_PATH, DEFAULT_SELECTION_PATH};
use crate::sources::nyt;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the News Curator application.
///
/// # Examples
///
/// ```sh
/// # Daily cron entry
/// news_curator fetch && news_curator select && news_curator post
///
/// # The same thing in one process
/// news_curator run
///
/// # Report a failed run to the channel
/// news_curator post --error "fetch stage failed: NYT/world: server returned 500"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch articles from NYT and the configured feeds
    Fetch {
        /// Where to write the article list
        #[arg(short, long, default_value = DEFAULT_ARTICLES_PATH)]
        output: PathBuf,

        #[command(flatten)]
        options: FetchOptions,
    },

    /// Ask the language model to shortlist articles
    Select {
        /// Article list written by `fetch`
        #[arg(short, long, default_value = DEFAULT_ARTICLES_PATH)]
        input: PathBuf,

        /// Where to write the shortlist
        #[arg(short, long, default_value = DEFAULT_SELECTION_PATH)]
        output: PathBuf,

        #[command(flatten)]
        options: SelectOptions,
    },

    /// Post the shortlist to the chat webhook
    Post {
        /// Shortlist written by `select`
        #[arg(short, long, default_value = DEFAULT_SELECTION_PATH)]
        input: PathBuf,

        /// Post this text instead of the shortlist
        #[arg(short, long, conflicts_with = "error")]
        message: Option<String>,

        /// Post a failure notice with this text
        #[arg(long)]
        error: Option<String>,

        #[command(flatten)]
        options: PostOptions,
    },

    /// Run fetch, select and post in order, stopping at the first failure
    Run {
        /// Article list handed from fetch to select
        #[arg(long, default_value = DEFAULT_ARTICLES_PATH)]
        articles: PathBuf,

        /// Shortlist handed from select to post
        #[arg(long, default_value = DEFAULT_SELECTION_PATH)]
        selection: PathBuf,

        #[command(flatten)]
        fetch: FetchOptions,

        #[command(flatten)]
        select: SelectOptions,

        #[command(flatten)]
        post: PostOptions,
    },
}

#[derive(Args, Debug, Clone)]
pub struct FetchOptions {
    /// Only keep articles published within this many hours
    #[arg(long, default_value_t = 48)]
    pub hours: u32,

    /// YAML file listing NYT sections and feeds (built-in list if omitted)
    #[arg(long, env = "NEWS_SOURCES_FILE")]
    pub sources: Option<PathBuf>,

    /// New York Times API key
    #[arg(long, env = "NYT_API_KEY", hide_env_values = true)]
    pub nyt_api_key: Option<String>,

    /// Base URL of the NYT API
    #[arg(long, env = "NYT_BASE_URL", default_value = nyt::DEFAULT_BASE_URL)]
    pub nyt_base_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct SelectOptions {
    /// Selection prompt file (built-in prompt if omitted)
    #[arg(short, long, env = "SELECT_PROMPT_FILE")]
    pub prompt: Option<PathBuf>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Model used for selection
    #[arg(long, env = "ANTHROPIC_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Messages API endpoint
    #[arg(long, env = "ANTHROPIC_API_URL", default_value = DEFAULT_API_URL)]
    pub anthropic_api_url: String,

    /// Upper bound on the model's reply length
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
}

#[derive(Args, Debug, Clone)]
pub struct PostOptions {
    /// Incoming webhook URL of the chat channel
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,
}
