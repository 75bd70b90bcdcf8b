//! Skill extraction pipeline
//!
//! Runs an NER model over a text, keeps SKILL entities, drops generic
//! stop-word spans and case-insensitive duplicates, then labels each
//! surviving span with an optional classifier.

use std::collections::HashSet;

use skillex_core::{Category, ExtractedSkill, ExtractionConfig, Result};

use crate::{NerModel, SpanClassifier};

/// Stateless extraction pipeline configured with an entity type and a
/// stop-word set
#[derive(Debug, Clone)]
pub struct SkillPipeline {
    entity_type: String,
    stop_words: HashSet<String>,
}

impl SkillPipeline {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            entity_type: config.entity_type.clone(),
            stop_words: config
                .stop_words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .collect(),
        }
    }

    /// Whether a normalized span text is a stop word
    pub fn is_stop_word(&self, normalized: &str) -> bool {
        self.stop_words.contains(normalized)
    }

    /// Extract skills from `text`.
    ///
    /// Fails only if the NER model fails. A classifier error degrades the
    /// affected span's label to `None`.
    pub fn extract_and_label(
        &self,
        text: &str,
        ner: &dyn NerModel,
        classifier: Option<&dyn SpanClassifier>,
    ) -> Result<Vec<ExtractedSkill>> {
        let mut entities = ner.run(text)?;
        let total = entities.len();
        entities.sort_by_key(|e| e.start);

        let mut seen: HashSet<String> = HashSet::new();
        let mut skills = Vec::new();

        for entity in entities {
            if !entity.entity_type.eq_ignore_ascii_case(&self.entity_type) {
                continue;
            }

            let span_text = entity.text.trim();
            let normalized = span_text.to_lowercase();
            if normalized.is_empty() || self.is_stop_word(&normalized) {
                continue;
            }

            // First occurrence wins
            if !seen.insert(normalized) {
                continue;
            }

            let label = classifier.and_then(|clf| classify(clf, span_text));

            skills.push(ExtractedSkill {
                span: span_text.to_string(),
                start: entity.start,
                end: entity.end,
                label,
            });
        }

        tracing::debug!("Kept {} of {} entity span(s)", skills.len(), total);
        Ok(skills)
    }
}

impl Default for SkillPipeline {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

/// Run the default pipeline (SKILL entities, built-in stop words)
pub fn extract_and_label(
    text: &str,
    ner: &dyn NerModel,
    classifier: Option<&dyn SpanClassifier>,
) -> Result<Vec<ExtractedSkill>> {
    SkillPipeline::default().extract_and_label(text, ner, classifier)
}

fn classify(classifier: &dyn SpanClassifier, span_text: &str) -> Option<Category> {
    match classifier.predict(&[span_text]) {
        Ok(labels) if labels.len() == 1 => labels.into_iter().next(),
        Ok(labels) => {
            tracing::warn!(
                "Classifier returned {} labels for one span {:?}, leaving it unlabeled",
                labels.len(),
                span_text
            );
            None
        }
        Err(e) => {
            tracing::warn!("Classifier failed on {:?}: {}", span_text, e);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
