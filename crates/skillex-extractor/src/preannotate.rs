//! Seed-based preannotation for the annotation tool
//!
//! Produces doccano documents with whole-word seed hits labeled. Hits of
//! one category never overlap (leftmost, then longest wins); a technical
//! and a soft label may still overlap for annotators to resolve.

use skillex_core::{Category, SeedList};

use crate::dataset::DoccanoDocument;
use crate::span::{resolve_overlaps, PhraseMatcher};

/// Labels seed phrase hits in free text
#[derive(Debug, Clone)]
pub struct Preannotator {
    /// Technical matchers first, then soft
    matchers: Vec<(PhraseMatcher, Category)>,
}

impl Preannotator {
    pub fn new(seeds: &SeedList) -> Self {
        let matchers = seeds
            .phrases()
            .filter_map(|(phrase, category)| {
                PhraseMatcher::whole_word(phrase).map(|matcher| (matcher, category))
            })
            .collect();
        Self { matchers }
    }

    /// Annotate one text. Label offsets count characters.
    pub fn annotate(&self, text: &str) -> DoccanoDocument {
        let mut label = Vec::new();
        for category in [Category::Technical, Category::Soft] {
            let hits = self
                .matchers
                .iter()
                .filter(|(_, c)| *c == category)
                .flat_map(|(matcher, _)| matcher.find_in(text));

            for (start, end) in resolve_overlaps(hits) {
                label.push((
                    char_offset(text, start),
                    char_offset(text, end),
                    category.as_str().to_string(),
                ));
            }
        }

        DoccanoDocument {
            text: text.to_string(),
            label,
        }
    }

    /// Annotate a batch of texts, in order
    pub fn annotate_all<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Vec<DoccanoDocument> {
        let documents: Vec<DoccanoDocument> = texts.into_iter().map(|t| self.annotate(t)).collect();
        let labeled = documents.iter().filter(|d| !d.label.is_empty()).count();
        tracing::info!(
            "Preannotated {} document(s), {} with at least one label",
            documents.len(),
            labeled
        );
        documents
    }
}

fn char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preannotator() -> Preannotator {
        Preannotator::new(&SeedList::new(
            ["python", "machine learning", "learning"],
            ["communication"],
        ))
    }

    #[test]
    fn test_annotate_labels_categories() {
        let doc = preannotator().annotate("Python and communication");
        assert_eq!(doc.text, "Python and communication");
        assert_eq!(
            doc.label,
            vec![
                (0, 6, "technical".to_string()),
                (11, 24, "soft".to_string()),
            ]
        );
    }

    #[test]
    fn test_same_category_hits_do_not_overlap() {
        let doc = preannotator().annotate("machine learning");
        assert_eq!(doc.label, vec![(0, 16, "technical".to_string())]);

        let doc = preannotator().annotate("learning and machine learning");
        assert_eq!(
            doc.label,
            vec![
                (0, 8, "technical".to_string()),
                (13, 29, "technical".to_string()),
            ]
        );
    }

    #[test]
    fn test_cross_category_overlap_kept() {
        let preannotator = Preannotator::new(&SeedList::new(["python"], ["python mentoring"]));
        let doc = preannotator.annotate("Python mentoring");
        assert_eq!(
            doc.label,
            vec![
                (0, 6, "technical".to_string()),
                (0, 16, "soft".to_string()),
            ]
        );
    }

    #[test]
    fn test_technical_before_soft() {
        let doc = preannotator().annotate("communication, Python");
        assert_eq!(doc.label[0].2, "technical");
        assert_eq!(doc.label[1].2, "soft");
    }

    #[test]
    fn test_whole_word_only() {
        let doc = preannotator().annotate("Pythonic code");
        assert!(doc.label.is_empty());
    }

    #[test]
    fn test_char_offsets_for_non_ascii() {
        let doc = preannotator().annotate("Café Python");
        assert_eq!(doc.label, vec![(5, 11, "technical".to_string())]);
    }

    #[test]
    fn test_annotate_all_keeps_order() {
        let docs = preannotator().annotate_all(["no skills", "python"]);
        assert_eq!(docs.len(), 2);
        assert!(docs[0].label.is_empty());
        assert_eq!(docs[1].label.len(), 1);
    }
}
