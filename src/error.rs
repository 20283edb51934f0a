//! Error types for each pipeline stage.
//!
//! Every stage fails fast: an error is logged once at the top level and turns
//! into a nonzero exit. The variants carry enough context (source name,
//! variable name, artifact path) for the diagnostic to stand on its own.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Missing credentials and unreadable configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("cannot read {path}: {error}")]
    Read {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("invalid sources file {path}: {error}")]
    Sources {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{origin}: request failed: {error}")]
    Request {
        origin: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{origin}: server returned {status}")]
    Status { origin: String, status: StatusCode },

    #[error("{origin}: cannot decode response: {error}")]
    Decode {
        origin: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{origin}: unreadable feed: {reason}")]
    Feed { origin: String, reason: String },
}

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("model API rejected the API key ({0})")]
    Unauthorized(StatusCode),

    #[error("model API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("model API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed model response: {reason}")]
    Malformed { reason: String },

    #[error("model referenced an article that was not in the input: {reference}")]
    UnknownArticle { reference: String },
}

#[derive(Error, Debug)]
pub enum PostError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Failure to hand a file from one stage to the next.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("cannot access artifact {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("artifact {path} is not valid JSON for this stage: {error}")]
    Json {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },
}

/// Top-level error naming the stage that failed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} stage failed: {error}")]
    Config {
        stage: &'static str,
        #[source]
        error: ConfigError,
    },

    #[error("{stage} stage failed: {error}")]
    Artifact {
        stage: &'static str,
        #[source]
        error: ArtifactError,
    },

    #[error("fetch stage failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("select stage failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("post stage failed: {0}")]
    Post(#[from] PostError),
}

impl PipelineError {
    pub fn config(stage: &'static str, error: ConfigError) -> Self {
        PipelineError::Config { stage, error }
    }

    pub fn artifact(stage: &'static str, error: ArtifactError) -> Self {
        PipelineError::Artifact { stage, error }
    }
}
