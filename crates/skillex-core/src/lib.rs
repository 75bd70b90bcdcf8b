//! Skillex Core - Domain models, errors and shared configuration
//!
//! This crate defines the types shared by the corpus builder and the
//! extraction pipeline:
//! - Skill categories and labeled spans
//! - Training examples and classifier-table rows
//! - Extraction output records
//! - Seed lists used for weak supervision
//! - Common error types and configuration

pub mod config;
pub mod seeds;

pub use config::{
    AppConfig, ClassifierConfig, ConfigError, CorpusConfig, ExtractionConfig, LoggingConfig,
};
pub use seeds::SeedList;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generic entity type every NER training span is tagged with
pub const SKILL_ENTITY_TYPE: &str = "SKILL";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for skill extraction operations
#[derive(Error, Debug)]
pub enum SkillError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("No labeled spans for classifier training: {0}")]
    EmptyTrainingSet(String),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SkillError {
    /// Wrap an IO error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SkillError>;

// ============================================================================
// Categories
// ============================================================================

/// Coarse classification of a skill mention
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technical,
    Soft,
    #[default]
    Unknown,
}

impl Category {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Soft => "soft",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a free-form label. Anything that is not `technical` or
    /// `soft` (case-insensitive, trimmed) maps to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "technical" => Self::Technical,
            "soft" => Self::Soft,
            _ => Self::Unknown,
        }
    }

    /// Whether rows with this category may be used to train a classifier
    pub fn is_trainable(&self) -> bool {
        matches!(self, Self::Technical | Self::Soft)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Raw input
// ============================================================================

/// One input row of the record source.
///
/// `entities` holds the raw JSON text of the pre-annotated spans; it is
/// parsed lazily so that malformed JSON can fall through to the other
/// annotation strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub description: String,
    pub entities: Option<String>,
    pub skills: Option<String>,
}

impl RawRecord {
    /// Create a record with only a description
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            entities: None,
            skills: None,
        }
    }

    /// Attach a JSON-encoded entity list
    pub fn with_entities(mut self, entities: impl Into<String>) -> Self {
        self.entities = Some(entities.into());
        self
    }

    /// Attach a delimited skill list
    pub fn with_skills(mut self, skills: impl Into<String>) -> Self {
        self.skills = Some(skills.into());
        self
    }
}

// ============================================================================
// Spans and training data
// ============================================================================

/// A categorized span of a source text. Offsets are UTF-8 byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub category: Category,
}

impl LabeledSpan {
    /// Build a span over `source[start..end]`.
    ///
    /// Returns `None` for zero-length, out-of-bounds or non-char-boundary
    /// ranges.
    pub fn from_source(source: &str, start: usize, end: usize, category: Category) -> Option<Self> {
        if start >= end || end > source.len() {
            return None;
        }
        let text = source.get(start..end)?;
        Some(Self {
            text: text.to_string(),
            start,
            end,
            category,
        })
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Spans are never empty once constructed
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether the `[start, end)` ranges intersect
    pub fn overlaps(&self, other: &LabeledSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A NER training document: the source text plus non-overlapping spans
/// sorted by start offset, all of entity type [`SKILL_ENTITY_TYPE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub spans: Vec<LabeledSpan>,
}

/// Row of the flat classifier-training table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRow {
    pub text: String,
    pub label: Category,
}

impl From<&LabeledSpan> for SpanRow {
    fn from(span: &LabeledSpan) -> Self {
        Self {
            text: span.text.clone(),
            label: span.category,
        }
    }
}

// ============================================================================
// Extraction output
// ============================================================================

/// A skill mention returned by the extraction pipeline.
///
/// `label` is `None` when no classifier was supplied or classification
/// failed for this span; it serializes as JSON `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSkill {
    pub span: String,
    pub start: usize,
    pub end: usize,
    pub label: Option<Category>,
}
