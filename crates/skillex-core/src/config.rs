//! Skillex Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! defaults matching the usual data/ and models/ layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Corpus builder configuration
    pub corpus: CorpusConfig,

    /// Extraction pipeline configuration
    pub extraction: ExtractionConfig,

    /// Classifier model configuration
    pub classifier: ClassifierConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variables on top of this configuration
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("SKILLEX_TECHNICAL_SEEDS") {
            self.corpus.technical_seed_path = path.into();
        }
        if let Ok(path) = std::env::var("SKILLEX_SOFT_SEEDS") {
            self.corpus.soft_seed_path = path.into();
        }
        if let Ok(ratio) = std::env::var("SKILLEX_TRAIN_RATIO") {
            self.corpus.train_ratio = ratio.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SKILLEX_TRAIN_RATIO".to_string(),
                value: ratio,
            })?;
        }

        if let Ok(path) = std::env::var("SKILLEX_CLASSIFIER") {
            self.classifier.model_path = path.into();
        }

        // Logging
        if let Ok(level) = std::env::var("SKILLEX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = std::env::var("SKILLEX_LOG_JSON") {
            self.logging.json_format = parse_bool(&json).ok_or(ConfigError::InvalidValue {
                key: "SKILLEX_LOG_JSON".to_string(),
                value: json,
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.corpus.train_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(ConfigError::InvalidValue {
                key: "corpus.train_ratio".to_string(),
                value: ratio.to_string(),
            });
        }
        let test_ratio = self.classifier.test_ratio;
        if !(0.0..1.0).contains(&test_ratio) {
            return Err(ConfigError::InvalidValue {
                key: "classifier.test_ratio".to_string(),
                value: test_ratio.to_string(),
            });
        }
        if self.corpus.skills_delimiter.is_empty() {
            return Err(ConfigError::MissingRequired(
                "corpus.skills_delimiter".to_string(),
            ));
        }
        if self.corpus.label_separator.is_empty() {
            return Err(ConfigError::MissingRequired(
                "corpus.label_separator".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Corpus builder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Technical seed phrase list (one phrase per line)
    pub technical_seed_path: PathBuf,

    /// Soft seed phrase list (one phrase per line)
    pub soft_seed_path: PathBuf,

    /// Share of examples written to the train file
    pub train_ratio: f64,

    /// Separator between tokens of the `skills` column
    pub skills_delimiter: String,

    /// Separator between phrase and category inside a token
    pub label_separator: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            technical_seed_path: PathBuf::from("data/technical_skills.csv"),
            soft_seed_path: PathBuf::from("data/soft_skills.csv"),
            train_ratio: 0.9,
            skills_delimiter: ";".to_string(),
            label_separator: ":".to_string(),
        }
    }
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Entity type the pipeline keeps (compared case-insensitively)
    pub entity_type: String,

    /// Generic terms never reported as skills
    pub stop_words: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            entity_type: crate::SKILL_ENTITY_TYPE.to_string(),
            stop_words: [
                "ability",
                "experience",
                "knowledge",
                "skills",
                "attitude",
                "team",
                "teams",
                "environment",
                "development",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Classifier model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Where the trained classifier is stored
    pub model_path: PathBuf,
    /// Share of each class held out for evaluation
    pub test_ratio: f64,
    /// Seed for the holdout shuffle
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/skill_classifier.json"),
            test_ratio: 0.15,
            seed: 42,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl From<ConfigError> for crate::SkillError {
    fn from(err: ConfigError) -> Self {
        crate::SkillError::ConfigError(err.to_string())
    }
}
