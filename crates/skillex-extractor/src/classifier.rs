//! Skill category classifier
//!
//! [`TrainingSet`] filters the classifier table down to rows usable for
//! training. [`LexiconClassifier`] is a vote-based [`SpanClassifier`]:
//! exact surface-form votes first, then per-token votes, then the
//! majority class of the training data. [`ClassificationReport`] scores
//! a classifier per class on held-out rows.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use skillex_core::{Category, Result, SkillError, SpanRow};

use crate::metrics::EntityMetrics;
use crate::SpanClassifier;

// ============================================================================
// Training set
// ============================================================================

/// Classifier rows restricted to the technical and soft categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSet {
    rows: Vec<SpanRow>,
}

impl TrainingSet {
    /// Keep only technical/soft rows.
    ///
    /// Fails with [`SkillError::EmptyTrainingSet`] when nothing is left.
    pub fn from_rows(rows: impl IntoIterator<Item = SpanRow>) -> Result<Self> {
        let mut dropped = 0usize;
        let rows: Vec<SpanRow> = rows
            .into_iter()
            .filter(|row| {
                let keep = row.label.is_trainable() && !row.text.trim().is_empty();
                if !keep {
                    dropped += 1;
                }
                keep
            })
            .collect();

        if rows.is_empty() {
            return Err(SkillError::EmptyTrainingSet(format!(
                "all {} row(s) are unknown or blank; provide technical/soft labeled spans",
                dropped
            )));
        }

        tracing::debug!("Training set: {} row(s), {} dropped", rows.len(), dropped);
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[SpanRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows per category
    pub fn class_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.label).or_insert(0) += 1;
        }
        counts
    }

    /// Stratified holdout split into (train, test).
    ///
    /// Each class sends `round(n * test_ratio)` of its rows to the test
    /// side but always keeps one for training. Both sides keep input
    /// order, and a given seed always picks the same rows.
    pub fn holdout(&self, test_ratio: f64, seed: u64) -> (TrainingSet, Vec<SpanRow>) {
        let ratio = if test_ratio.is_nan() {
            0.0
        } else {
            test_ratio.clamp(0.0, 1.0)
        };

        let mut by_class: BTreeMap<Category, Vec<usize>> = BTreeMap::new();
        for (idx, row) in self.rows.iter().enumerate() {
            by_class.entry(row.label).or_default().push(idx);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut held_out = BTreeSet::new();
        for indices in by_class.values_mut() {
            let take = ((indices.len() as f64 * ratio).round() as usize)
                .min(indices.len().saturating_sub(1));
            indices.shuffle(&mut rng);
            held_out.extend(indices.iter().take(take).copied());
        }

        let (test, train): (Vec<_>, Vec<_>) = self
            .rows
            .iter()
            .enumerate()
            .partition(|(idx, _)| held_out.contains(idx));

        tracing::debug!(
            "Holdout split: {} train, {} test row(s)",
            train.len(),
            test.len()
        );
        (
            TrainingSet {
                rows: train.into_iter().map(|(_, row)| row.clone()).collect(),
            },
            test.into_iter().map(|(_, row)| row.clone()).collect(),
        )
    }
}

// ============================================================================
// Classification report
// ============================================================================

/// Per-class scores of a classifier on labeled rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationReport {
    pub per_class: BTreeMap<Category, EntityMetrics>,
    pub correct: usize,
    pub total: usize,
}

impl ClassificationReport {
    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f32 / self.total as f32
        }
    }

    /// Unweighted mean F1 over the reported classes
    pub fn macro_f1(&self) -> f32 {
        if self.per_class.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.per_class.values().map(EntityMetrics::f1_score).sum();
        sum / self.per_class.len() as f32
    }

    /// Render as a text table
    pub fn report(&self) -> String {
        let mut out = format!(
            "{:>12} {:>9} {:>9} {:>9} {:>9}\n",
            "", "precision", "recall", "f1-score", "support"
        );
        for (category, metrics) in &self.per_class {
            out.push_str(&format!(
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                category.as_str(),
                metrics.precision(),
                metrics.recall(),
                metrics.f1_score(),
                metrics.gold_total
            ));
        }
        out.push_str(&format!(
            "\n{:>12} {:>29.2} {:>9}\n{:>12} {:>29.2} {:>9}\n",
            "accuracy",
            self.accuracy(),
            self.total,
            "macro f1",
            self.macro_f1(),
            self.total
        ));
        out
    }
}

// ============================================================================
// Lexicon classifier
// ============================================================================

/// Technical/soft vote counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Votes {
    pub technical: usize,
    pub soft: usize,
}

impl Votes {
    fn add(&mut self, category: Category) {
        match category {
            Category::Technical => self.technical += 1,
            Category::Soft => self.soft += 1,
            Category::Unknown => {}
        }
    }

    fn merge(&mut self, other: &Votes) {
        self.technical += other.technical;
        self.soft += other.soft;
    }

    /// Winning category, `None` on a tie
    pub fn winner(&self) -> Option<Category> {
        match self.technical.cmp(&self.soft) {
            std::cmp::Ordering::Greater => Some(Category::Technical),
            std::cmp::Ordering::Less => Some(Category::Soft),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Vote-based span classifier trained from the classifier table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconClassifier {
    surface: BTreeMap<String, Votes>,
    tokens: BTreeMap<String, Votes>,
    prior: Category,
}

impl LexiconClassifier {
    /// Fit a classifier on a training set
    pub fn fit(set: &TrainingSet) -> Self {
        let mut surface: BTreeMap<String, Votes> = BTreeMap::new();
        let mut tokens: BTreeMap<String, Votes> = BTreeMap::new();
        let mut totals = Votes::default();

        for row in set.rows() {
            let normalized = row.text.trim().to_lowercase();
            for token in tokenize(&normalized) {
                tokens.entry(token.to_string()).or_default().add(row.label);
            }
            surface.entry(normalized).or_default().add(row.label);
            totals.add(row.label);
        }

        let prior = totals.winner().unwrap_or(Category::Technical);
        tracing::info!(
            "Fitted lexicon classifier: {} surface form(s), {} token(s), prior {}",
            surface.len(),
            tokens.len(),
            prior
        );

        Self {
            surface,
            tokens,
            prior,
        }
    }

    /// Classify a single span text
    pub fn classify(&self, text: &str) -> Category {
        let normalized = text.trim().to_lowercase();

        if let Some(category) = self.surface.get(&normalized).and_then(Votes::winner) {
            return category;
        }

        let mut votes = Votes::default();
        for token in tokenize(&normalized) {
            if let Some(token_votes) = self.tokens.get(token) {
                votes.merge(token_votes);
            }
        }
        votes.winner().unwrap_or(self.prior)
    }

    /// Score predictions on labeled rows, per class
    pub fn evaluate(&self, rows: &[SpanRow]) -> ClassificationReport {
        let mut report = ClassificationReport::default();
        for category in [Category::Technical, Category::Soft] {
            report.per_class.insert(category, EntityMetrics::default());
        }

        for row in rows.iter().filter(|row| row.label.is_trainable()) {
            let predicted = self.classify(&row.text);
            report.total += 1;

            let gold = report.per_class.entry(row.label).or_default();
            gold.gold_total += 1;
            if predicted == row.label {
                gold.true_positives += 1;
                report.correct += 1;
            } else {
                gold.false_negatives += 1;
            }

            let guessed = report.per_class.entry(predicted).or_default();
            guessed.predicted_total += 1;
            if predicted != row.label {
                guessed.false_positives += 1;
            }
        }
        report
    }

    /// Write the classifier as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SkillError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| SkillError::io(path, e))
    }

    /// Read a classifier written by [`LexiconClassifier::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SkillError::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl SpanClassifier for LexiconClassifier {
    fn predict(&self, texts: &[&str]) -> Result<Vec<Category>> {
        Ok(texts.iter().map(|text| self.classify(text)).collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#')))
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str, label: Category) -> SpanRow {
        SpanRow {
            text: text.to_string(),
            label,
        }
    }

    fn training_set() -> TrainingSet {
        TrainingSet::from_rows(vec![
            row("Python", Category::Technical),
            row("python", Category::Technical),
            row("SQL", Category::Technical),
            row("machine learning", Category::Technical),
            row("communication", Category::Soft),
            row("written communication", Category::Soft),
            row("teamwork", Category::Unknown),
        ])
        .unwrap()
    }

    #[test]
    fn test_training_set_filters_unknown() {
        let set = training_set();
        assert_eq!(set.len(), 6);
        let counts = set.class_counts();
        assert_eq!(counts[&Category::Technical], 4);
        assert_eq!(counts[&Category::Soft], 2);
        assert!(!counts.contains_key(&Category::Unknown));
    }

    #[test]
    fn test_empty_training_set_is_fatal() {
        let err = TrainingSet::from_rows(vec![
            row("teamwork", Category::Unknown),
            row("  ", Category::Technical),
        ])
        .unwrap_err();
        assert!(matches!(err, SkillError::EmptyTrainingSet(_)));

        assert!(TrainingSet::from_rows(Vec::new()).is_err());
    }

    #[test]
    fn test_exact_surface_match() {
        let clf = LexiconClassifier::fit(&training_set());
        assert_eq!(clf.classify("PYTHON"), Category::Technical);
        assert_eq!(clf.classify(" Communication "), Category::Soft);
    }

    #[test]
    fn test_token_votes() {
        let clf = LexiconClassifier::fit(&training_set());
        assert_eq!(clf.classify("verbal communication"), Category::Soft);
        assert_eq!(clf.classify("Python scripting"), Category::Technical);
    }

    #[test]
    fn test_prior_when_no_evidence() {
        let clf = LexiconClassifier::fit(&training_set());
        assert_eq!(clf.classify("origami"), Category::Technical);

        let soft_only = TrainingSet::from_rows(vec![row("empathy", Category::Soft)]).unwrap();
        let clf = LexiconClassifier::fit(&soft_only);
        assert_eq!(clf.classify("origami"), Category::Soft);
    }

    #[test]
    fn test_predict_batch_preserves_order() {
        let clf = LexiconClassifier::fit(&training_set());
        let labels = clf.predict(&["communication", "SQL"]).unwrap();
        assert_eq!(labels, vec![Category::Soft, Category::Technical]);
        assert!((clf.evaluate(training_set().rows()).accuracy() - 1.0).abs() < 0.001);
    }

    fn mixed_set() -> TrainingSet {
        let technical = (0..20).map(|i| row(&format!("tool{i}"), Category::Technical));
        let soft = (0..10).map(|i| row(&format!("trait{i}"), Category::Soft));
        TrainingSet::from_rows(technical.chain(soft)).unwrap()
    }

    #[test]
    fn test_holdout_is_stratified_and_reproducible() {
        let set = mixed_set();
        let (train, test) = set.holdout(0.15, 42);

        let test_technical = test.iter().filter(|r| r.label == Category::Technical).count();
        let test_soft = test.iter().filter(|r| r.label == Category::Soft).count();
        assert_eq!((test_technical, test_soft), (3, 2));
        assert_eq!(train.len(), 25);

        let (train_again, test_again) = set.holdout(0.15, 42);
        assert_eq!(train_again, train);
        assert_eq!(test_again, test);

        let mut all: Vec<String> = train
            .rows()
            .iter()
            .chain(test.iter())
            .map(|r| r.text.clone())
            .collect();
        all.sort();
        let mut expected: Vec<String> = set.rows().iter().map(|r| r.text.clone()).collect();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_holdout_keeps_a_training_row_per_class() {
        let set = TrainingSet::from_rows(vec![
            row("empathy", Category::Soft),
            row("rust", Category::Technical),
            row("go", Category::Technical),
        ])
        .unwrap();

        let (train, test) = set.holdout(0.9, 7);
        assert_eq!(test.len(), 1);
        assert_eq!(test[0].label, Category::Technical);
        assert_eq!(train.class_counts()[&Category::Soft], 1);

        let (train, test) = set.holdout(0.0, 7);
        assert!(test.is_empty());
        assert_eq!(train, set);
    }

    #[test]
    fn test_evaluate_per_class() {
        let clf = LexiconClassifier::fit(&training_set());
        let rows = vec![
            row("Python", Category::Technical),
            row("communication", Category::Soft),
            row("origami", Category::Soft),
            row("SQL", Category::Technical),
        ];

        let report = clf.evaluate(&rows);
        assert_eq!((report.correct, report.total), (3, 4));

        let technical = &report.per_class[&Category::Technical];
        assert_eq!(
            (technical.true_positives, technical.false_positives, technical.false_negatives),
            (2, 1, 0)
        );
        assert!((technical.precision() - 2.0 / 3.0).abs() < 0.001);
        assert!((technical.f1_score() - 0.8).abs() < 0.001);

        let soft = &report.per_class[&Category::Soft];
        assert_eq!(
            (soft.true_positives, soft.false_positives, soft.false_negatives),
            (1, 0, 1)
        );
        assert!((soft.recall() - 0.5).abs() < 0.001);

        assert!((report.accuracy() - 0.75).abs() < 0.001);
        assert!((report.macro_f1() - (0.8 + 2.0 / 3.0) / 2.0).abs() < 0.001);

        let table = report.report();
        assert!(table.contains("technical"));
        assert!(table.contains("accuracy"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("skill_classifier.json");

        let clf = LexiconClassifier::fit(&training_set());
        clf.save(&path).unwrap();

        let loaded = LexiconClassifier::load(&path).unwrap();
        assert_eq!(loaded, clf);
    }

    #[test]
    fn test_load_missing_file() {
        let err = LexiconClassifier::load("/nonexistent/clf.json").unwrap_err();
        assert!(matches!(err, SkillError::Io { .. }));
    }
}
