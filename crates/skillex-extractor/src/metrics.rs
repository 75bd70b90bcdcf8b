//! Quality Metrics module
//!
//! Scores extracted skills against gold spans with precision, recall and
//! F1, per document and aggregated over a dev set.

use serde::{Deserialize, Serialize};

use skillex_core::ExtractedSkill;

use crate::dataset::NerDocument;

// ============================================================================
// Entity Metrics
// ============================================================================

/// Match counts for one evaluation: spans of a document, or one class
/// of a classifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetrics {
    /// Predicted spans matching a gold span
    pub true_positives: usize,
    /// Predicted spans matching nothing
    pub false_positives: usize,
    /// Gold spans never matched
    pub false_negatives: usize,
    pub gold_total: usize,
    pub predicted_total: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}

impl EntityMetrics {
    /// Share of predictions that hit something gold
    pub fn precision(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// Share of gold items that were predicted
    pub fn recall(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Harmonic mean of precision and recall, 0 when both are 0
    pub fn f1_score(&self) -> f32 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    fn merge(&mut self, other: &EntityMetrics) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.gold_total += other.gold_total;
        self.predicted_total += other.predicted_total;
    }
}

// ============================================================================
// Gold Standard Types
// ============================================================================

/// A gold skill span for evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GoldSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl GoldSpan {
    /// Gold spans of a training document. Out-of-range spans are skipped.
    pub fn from_document(document: &NerDocument) -> Vec<GoldSpan> {
        document
            .spans
            .iter()
            .filter_map(|span| {
                document.text.get(span.start..span.end).map(|text| GoldSpan {
                    text: text.to_string(),
                    start: span.start,
                    end: span.end,
                })
            })
            .collect()
    }
}

impl From<&ExtractedSkill> for GoldSpan {
    fn from(skill: &ExtractedSkill) -> Self {
        Self {
            text: skill.span.clone(),
            start: skill.start,
            end: skill.end,
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluator for extraction quality
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    /// Exact offsets required; otherwise normalized text is compared
    strict: bool,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable strict span matching
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    fn spans_match(&self, predicted: &GoldSpan, gold: &GoldSpan) -> bool {
        if self.strict {
            predicted.start == gold.start && predicted.end == gold.end
        } else {
            predicted.text.trim().to_lowercase() == gold.text.trim().to_lowercase()
        }
    }

    /// Score one document. Each gold span matches at most once.
    pub fn evaluate(&self, predicted: &[ExtractedSkill], gold: &[GoldSpan]) -> EntityMetrics {
        let mut matched = vec![false; gold.len()];
        let mut true_positives = 0;

        for pred in predicted.iter().map(GoldSpan::from) {
            let hit = gold
                .iter()
                .enumerate()
                .find(|(idx, g)| !matched[*idx] && self.spans_match(&pred, g))
                .map(|(idx, _)| idx);
            if let Some(idx) = hit {
                matched[idx] = true;
                true_positives += 1;
            }
        }

        EntityMetrics {
            true_positives,
            false_positives: predicted.len() - true_positives,
            false_negatives: gold.len() - true_positives,
            gold_total: gold.len(),
            predicted_total: predicted.len(),
        }
    }
}

// ============================================================================
// Aggregate Metrics
// ============================================================================

/// Aggregate metrics for a batch of evaluations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub entity_metrics: EntityMetrics,
    pub num_documents: usize,
}

impl AggregateMetrics {
    /// Add one document's metrics
    pub fn add(&mut self, metrics: &EntityMetrics) {
        self.entity_metrics.merge(metrics);
        self.num_documents += 1;
    }

    /// Print a summary report
    pub fn report(&self) -> String {
        format!(
            "=== Skill Extraction Report ===\n\n\
             Documents evaluated: {}\n\n\
               Precision: {:.1}%\n\
               Recall:    {:.1}%\n\
               F1 Score:  {:.1}%\n\
               Gold: {} | Predicted: {} | TP: {} | FP: {} | FN: {}\n",
            self.num_documents,
            self.entity_metrics.precision() * 100.0,
            self.entity_metrics.recall() * 100.0,
            self.entity_metrics.f1_score() * 100.0,
            self.entity_metrics.gold_total,
            self.entity_metrics.predicted_total,
            self.entity_metrics.true_positives,
            self.entity_metrics.false_positives,
            self.entity_metrics.false_negatives,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::NerSpan;

    fn skill(span: &str, start: usize) -> ExtractedSkill {
        ExtractedSkill {
            span: span.to_string(),
            start,
            end: start + span.len(),
            label: None,
        }
    }

    fn gold(text: &str, start: usize) -> GoldSpan {
        GoldSpan {
            text: text.to_string(),
            start,
            end: start + text.len(),
        }
    }

    #[test]
    fn test_precision_recall_f1() {
        let metrics = EntityMetrics {
            true_positives: 6,
            false_positives: 2,
            false_negatives: 4,
            gold_total: 10,
            predicted_total: 8,
        };

        assert!((metrics.precision() - 0.75).abs() < 0.001);
        assert!((metrics.recall() - 0.6).abs() < 0.001);
        // 2 * 0.75 * 0.6 / 1.35
        assert!((metrics.f1_score() - 0.6667).abs() < 0.001);
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let metrics = EntityMetrics::default();
        assert_eq!(metrics.precision(), 0.0);
        assert_eq!(metrics.recall(), 0.0);
        assert_eq!(metrics.f1_score(), 0.0);
    }

    #[test]
    fn test_evaluate_perfect() {
        let metrics = Evaluator::new().strict().evaluate(
            &[skill("Python", 0), skill("SQL", 10)],
            &[gold("Python", 0), gold("SQL", 10)],
        );

        assert_eq!(metrics.true_positives, 2);
        assert_eq!(metrics.false_positives, 0);
        assert_eq!(metrics.false_negatives, 0);
        assert!((metrics.recall() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_relaxed_matches_text_only() {
        let predicted = [skill("python", 20)];
        let gold_spans = [gold("Python", 0)];

        let relaxed = Evaluator::new().evaluate(&predicted, &gold_spans);
        assert_eq!(relaxed.true_positives, 1);

        let strict = Evaluator::new().strict().evaluate(&predicted, &gold_spans);
        assert_eq!(strict.true_positives, 0);
        assert_eq!(strict.false_positives, 1);
        assert_eq!(strict.false_negatives, 1);
    }

    #[test]
    fn test_gold_matched_once() {
        let metrics = Evaluator::new().evaluate(
            &[skill("Python", 0), skill("Python", 20)],
            &[gold("Python", 0)],
        );
        assert_eq!(metrics.true_positives, 1);
        assert_eq!(metrics.false_positives, 1);
        assert_eq!(metrics.false_negatives, 0);
    }

    #[test]
    fn test_gold_from_document() {
        let document = NerDocument {
            text: "Strong Python".to_string(),
            spans: vec![
                NerSpan {
                    start: 7,
                    end: 13,
                    label: "SKILL".to_string(),
                },
                NerSpan {
                    start: 7,
                    end: 99,
                    label: "SKILL".to_string(),
                },
            ],
        };
        assert_eq!(GoldSpan::from_document(&document), vec![gold("Python", 7)]);
    }

    #[test]
    fn test_aggregate_metrics_report() {
        let evaluator = Evaluator::new();
        let mut aggregate = AggregateMetrics::default();
        aggregate.add(&evaluator.evaluate(&[skill("Python", 0)], &[gold("Python", 0)]));
        aggregate.add(&evaluator.evaluate(&[skill("Excel", 0)], &[gold("SQL", 0)]));

        assert_eq!(aggregate.num_documents, 2);
        assert_eq!(aggregate.entity_metrics.true_positives, 1);
        assert_eq!(aggregate.entity_metrics.gold_total, 2);

        let report = aggregate.report();
        assert!(report.contains("Documents evaluated: 2"));
        assert!(report.contains("Precision: 50.0%"));
    }
}
