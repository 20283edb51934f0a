//! JSON artifacts passed between stages.
//!
//! ```text
//! /tmp/today_articles.json   # fetch  -> select  (ArticleBatch)
//! /tmp/selected.json         # select -> post    (SelectionResult)
//! ```
//!
//! Files are pretty-printed UTF-8. A later run simply overwrites them.

use crate::error::ArtifactError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

pub const DEFAULT_ARTICLES_PATH: &str = "/tmp/today_articles.json";
pub const DEFAULT_SELECTION_PATH: &str = "/tmp/selected.json";

/// Serialize `value` to `path` as pretty-printed JSON.
///
/// Creates the parent directory if needed and replaces any existing file.
///
/// # Returns
///
/// `Ok(())` on success, or an [`ArtifactError`] naming `path` if directory
/// creation, serialization or the write fails.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_artifact<T: Serialize>(value: &T, path: &Path) -> Result<(), ArtifactError> {
    let io_err = |error| ArtifactError::Io {
        path: path.to_path_buf(),
        error,
    };

    let json = serde_json::to_string_pretty(value).map_err(|error| ArtifactError::Json {
        path: path.to_path_buf(),
        error,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create artifact dir");
            return Err(io_err(e));
        }
    }

    fs::write(path, json).await.map_err(io_err)?;
    info!("Wrote artifact");
    Ok(())
}

/// Read and deserialize the artifact at `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|error| ArtifactError::Io {
            path: path.to_path_buf(),
            error,
        })?;
    serde_json::from_str(&text).map_err(|error| ArtifactError::Json {
        path: path.to_path_buf(),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{batch, record};
    use crate::models::{ArticleBatch, SelectionResult, Source};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("articles.json");
        let original = batch(vec![record(Source::Nyt, 1), record(Source::Economist, 2)]);

        write_artifact(&original, &path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"total_count\": 2"));
        assert!(text.contains("\"source\": \"NYT\""));

        let loaded: ArticleBatch = read_artifact(&path).await.unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_non_ascii_is_written_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("articles.json");
        let mut rec = record(Source::Economist, 1);
        rec.title = "Café au lait économique".to_string();

        write_artifact(&batch(vec![rec]), &path).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Café au lait économique"));
    }

    #[tokio::test]
    async fn test_read_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let err = read_artifact::<SelectionResult>(&path).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
        assert!(err.to_string().contains("missing.json"));
    }

    #[tokio::test]
    async fn test_read_wrong_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("selected.json");
        std::fs::write(&path, r#"{"articles": []}"#).unwrap();
        let err = read_artifact::<SelectionResult>(&path).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Json { .. }));
    }
}
