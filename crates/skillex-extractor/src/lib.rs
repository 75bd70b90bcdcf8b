//! Skillex Extractor - Skill corpus building and extraction pipeline
//!
//! Builds span-labeled NER training data from weak supervision sources
//! and turns raw NER output into a deduplicated, classified skill list.

use serde::{Deserialize, Serialize};

use skillex_core::{Category, Result};

/// Entity span emitted by an NER model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub entity_type: String,
}

/// Trait for NER models
pub trait NerModel: Send + Sync {
    /// Tag `text`, returning entity spans in document order
    fn run(&self, text: &str) -> Result<Vec<EntitySpan>>;
}

/// Trait for span classifiers
pub trait SpanClassifier: Send + Sync {
    /// Predict one category per input text, same order and length
    fn predict(&self, texts: &[&str]) -> Result<Vec<Category>>;
}

pub mod classifier;
pub mod corpus;
pub mod dataset;
pub mod metrics;
pub mod ner;
pub mod pipeline;
pub mod preannotate;
pub mod span;

pub use classifier::{ClassificationReport, LexiconClassifier, TrainingSet};
pub use corpus::{AnnotationSource, CorpusBuilder, CorpusOutput, CorpusStats, EntityList};
pub use dataset::BuildManifest;
pub use metrics::{AggregateMetrics, EntityMetrics, Evaluator};
pub use ner::DictionaryNer;
pub use pipeline::{extract_and_label, SkillPipeline};
pub use preannotate::Preannotator;
pub use span::{find_occurrences, resolve_overlaps, Extent};
