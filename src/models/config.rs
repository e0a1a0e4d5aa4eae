//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Strategy;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Strategy selection policy
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Pattern store location and retention
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP client settings for static pages
    #[serde(default)]
    pub http: HttpConfig,

    /// Strategy catalogue; the built-in one is used when empty
    #[serde(default)]
    pub strategies: Vec<Strategy>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Like [`Config::load_or_default`], but a missing file is the normal
    /// case and only logged at debug level.
    pub fn load_optional(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            log::debug!("Loading configuration from {}", path.display());
            Self::load_or_default(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Self::default()
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.extraction.success_threshold == 0 {
            return Err(AppError::validation(
                "extraction.success_threshold must be > 0",
            ));
        }
        if self.extraction.strategy_timeout_ms == 0 {
            return Err(AppError::validation(
                "extraction.strategy_timeout_ms must be > 0",
            ));
        }
        self.extraction.qualifying_regex()?;
        if self.storage.max_history == 0 {
            return Err(AppError::validation("storage.max_history must be > 0"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        for strategy in &self.strategies {
            strategy.validate()?;
        }
        Ok(())
    }
}

/// Strategy selection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Yield at which a strategy is good enough to stop trying others
    #[serde(default = "defaults::success_threshold")]
    pub success_threshold: usize,

    /// Ceiling on the time one strategy may take, in milliseconds
    #[serde(default = "defaults::strategy_timeout")]
    pub strategy_timeout_ms: u64,

    /// Regex an image URL must match to count as full-size
    #[serde(default = "defaults::qualifying_pattern")]
    pub qualifying_pattern: String,
}

impl ExtractionConfig {
    /// Compile the qualifying-image pattern.
    pub fn qualifying_regex(&self) -> Result<Regex> {
        Ok(Regex::new(&self.qualifying_pattern)?)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            success_threshold: defaults::success_threshold(),
            strategy_timeout_ms: defaults::strategy_timeout(),
            qualifying_pattern: defaults::qualifying_pattern(),
        }
    }
}

/// Pattern store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding per-domain records
    #[serde(default = "defaults::root_dir")]
    pub root_dir: PathBuf,

    /// Entries kept per history list
    #[serde(default = "defaults::max_history")]
    pub max_history: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: defaults::root_dir(),
            max_history: defaults::max_history(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Extraction defaults
    pub fn success_threshold() -> usize {
        20
    }
    pub fn strategy_timeout() -> u64 {
        30_000
    }
    pub fn qualifying_pattern() -> String {
        r"_(600x450|1200x900)\.jpg".into()
    }

    // Storage defaults
    pub fn root_dir() -> PathBuf {
        PathBuf::from("storage")
    }
    pub fn max_history() -> usize {
        50
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; harvester/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let mut config = Config::default();
        config.extraction.success_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_pattern() {
        let mut config = Config::default();
        config.extraction.qualifying_pattern = "(unclosed".to_string();
        assert!(matches!(config.validate(), Err(AppError::Pattern(_))));
    }

    #[test]
    fn validate_rejects_empty_strategy() {
        let mut config = Config::default();
        config.strategies.push(Strategy::new("empty", vec![]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_repeat_without_actions() {
        let config: Config = toml::from_str(
            r#"
            [[strategies]]
            name = "spin"
            steps = [{ action = "repeat", times = 400000000, steps = [] }]
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn load_optional_handles_missing_and_present_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let config = Config::load_optional(&path);
        assert_eq!(config.extraction.success_threshold, 20);

        std::fs::write(&path, "[extraction]\nsuccess_threshold = 3\n").unwrap();
        assert_eq!(Config::load_optional(&path).extraction.success_threshold, 3);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [extraction]
            success_threshold = 8

            [storage]
            max_history = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.extraction.success_threshold, 8);
        assert_eq!(config.extraction.strategy_timeout_ms, 30_000);
        assert_eq!(config.storage.max_history, 5);
        assert_eq!(config.storage.root_dir, PathBuf::from("storage"));
        assert!(config.strategies.is_empty());
    }

    #[test]
    fn default_pattern_matches_full_size_urls() {
        let re = ExtractionConfig::default().qualifying_regex().unwrap();
        assert!(re.is_match("https://images.craigslist.org/00a0a_abc_600x450.jpg"));
        assert!(!re.is_match("https://images.craigslist.org/00a0a_abc_50x50c.jpg"));
    }
}
