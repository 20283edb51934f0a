//! Source configuration and credential checks.
//!
//! The set of NYT sections and feed URLs is fixed by default and can be
//! replaced with a YAML file:
//!
//! ```yaml
//! nyt_sections: [technology, business, world]
//! feeds:
//!   - source: Bloomberg
//!     section: markets
//!     url: https://feeds.bloomberg.com/markets/news.rss
//! ```
//!
//! Credentials come from the CLI layer (flag or environment variable) and are
//! validated here before any stage touches the network.

use crate::error::ConfigError;
use crate::models::Source;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};

pub const NYT_API_KEY: &str = "NYT_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";

const NYT_SECTIONS: [&str; 3] = ["technology", "business", "world"];
const BLOOMBERG_SECTIONS: [&str; 3] = ["markets", "technology", "politics"];
const ECONOMIST_SECTIONS: [&str; 3] = [
    "finance-and-economics",
    "business",
    "science-and-technology",
];

/// One RSS or Atom feed to poll.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
    pub source: Source,
    #[serde(default)]
    pub section: String,
    pub url: String,
}

impl FeedConfig {
    /// Name used in logs and error messages, e.g. `Bloomberg/markets`.
    pub fn label(&self) -> String {
        if self.section.is_empty() {
            format!("{} {}", self.source, self.url)
        } else {
            format!("{}/{}", self.source, self.section)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub nyt_sections: Vec<String>,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let bloomberg = BLOOMBERG_SECTIONS.iter().map(|s| FeedConfig {
            source: Source::Bloomberg,
            section: s.to_string(),
            url: format!("https://feeds.bloomberg.com/{s}/news.rss"),
        });
        let economist = ECONOMIST_SECTIONS.iter().map(|s| FeedConfig {
            source: Source::Economist,
            section: s.to_string(),
            url: format!("https://www.economist.com/{s}/rss.xml"),
        });
        Self {
            nyt_sections: NYT_SECTIONS.iter().map(|s| s.to_string()).collect(),
            feeds: bloomberg.chain(economist).collect(),
        }
    }
}

impl SourcesConfig {
    pub fn from_yaml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|error| ConfigError::Sources {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Load the sources file if one was given, otherwise use the built-in set.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = read_text(path).await?;
        let config = Self::from_yaml(&text, path)?;
        info!(
            path = %path.display(),
            nyt_sections = config.nyt_sections.len(),
            feeds = config.feeds.len(),
            "Loaded sources file"
        );
        Ok(config)
    }
}

/// Read a UTF-8 configuration file (sources file, prompt file).
pub async fn read_text(path: &Path) -> Result<String, ConfigError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|error| ConfigError::Read {
            path: path.to_path_buf(),
            error,
        })
}

/// Return the credential if it is set and non-blank.
pub fn require<'a>(value: Option<&'a str>, var: &'static str) -> Result<&'a str, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_sources() {
        let config = SourcesConfig::default();
        assert_eq!(config.nyt_sections, vec!["technology", "business", "world"]);
        assert_eq!(config.feeds.len(), 6);
        assert_eq!(
            config.feeds[0].url,
            "https://feeds.bloomberg.com/markets/news.rss"
        );
        assert!(config
            .feeds
            .iter()
            .any(|f| f.source == Source::Economist && f.section == "business"));
        assert!(config.feeds.iter().all(|f| f.source != Source::Guardian));
    }

    #[test]
    fn test_sources_from_yaml() {
        let yaml = r#"
nyt_sections: [science]
feeds:
  - source: Guardian
    section: world
    url: https://www.theguardian.com/world/rss
  - source: Bloomberg
    url: https://feeds.bloomberg.com/markets/news.rss
"#;
        let config = SourcesConfig::from_yaml(yaml, Path::new("sources.yaml")).unwrap();
        assert_eq!(config.nyt_sections, vec!["science"]);
        assert_eq!(config.feeds[0].source, Source::Guardian);
        assert_eq!(config.feeds[0].label(), "Guardian/world");
        assert_eq!(
            config.feeds[1].label(),
            "Bloomberg https://feeds.bloomberg.com/markets/news.rss"
        );
    }

    #[test]
    fn test_sources_from_yaml_rejects_unknown_source() {
        let yaml = "feeds:\n  - source: Reuters\n    url: https://example.com/rss\n";
        let err = SourcesConfig::from_yaml(yaml, Path::new("bad.yaml")).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[tokio::test]
    async fn test_load_without_path_uses_defaults() {
        let config = SourcesConfig::load(None).await.unwrap();
        assert_eq!(config, SourcesConfig::default());
    }

    #[test]
    fn test_require() {
        assert_eq!(require(Some("abc"), NYT_API_KEY).unwrap(), "abc");
        let err = require(None, NYT_API_KEY).unwrap_err();
        assert_eq!(
            err.to_string(),
            "required environment variable NYT_API_KEY is not set"
        );
        assert!(matches!(
            require(Some("   "), SLACK_WEBHOOK_URL),
            Err(ConfigError::MissingVar("SLACK_WEBHOOK_URL"))
        ));
    }
}
