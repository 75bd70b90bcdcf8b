//! Dictionary-based skill tagger
//!
//! A vocabulary-driven [`NerModel`] built from the seed lists and,
//! optionally, the surface forms of the classifier table. Useful as a
//! baseline and for running the pipeline without a statistical model.

use std::collections::HashSet;

use skillex_core::{Result, SeedList, SpanRow, SKILL_ENTITY_TYPE};

use crate::span::{resolve_overlaps, PhraseMatcher};
use crate::{EntitySpan, NerModel};

/// Tags whole-word, case-insensitive vocabulary hits as SKILL entities
#[derive(Debug, Clone, Default)]
pub struct DictionaryNer {
    /// Compiled matchers, in insertion order
    matchers: Vec<PhraseMatcher>,
    /// Lowercase terms already added
    terms: HashSet<String>,
}

impl DictionaryNer {
    /// Create an empty tagger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tagger over every seed phrase
    pub fn from_seeds(seeds: &SeedList) -> Self {
        let mut ner = Self::new();
        for (phrase, _) in seeds.phrases() {
            ner.add_term(phrase);
        }
        ner
    }

    /// Add the surface forms of classifier rows
    pub fn with_rows<'a>(mut self, rows: impl IntoIterator<Item = &'a SpanRow>) -> Self {
        for row in rows {
            self.add_term(&row.text);
        }
        self
    }

    /// Add a vocabulary term; blank and repeated terms are ignored
    pub fn add_term(&mut self, term: &str) -> bool {
        let normalized = term.trim().to_lowercase();
        if normalized.is_empty() || self.terms.contains(&normalized) {
            return false;
        }
        let Some(matcher) = PhraseMatcher::whole_word(&normalized) else {
            return false;
        };
        self.matchers.push(matcher);
        self.terms.insert(normalized);
        true
    }

    /// Number of vocabulary terms
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl NerModel for DictionaryNer {
    fn run(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let mut entities = Vec::new();

        for matcher in &self.matchers {
            for (start, end) in matcher.find_in(text) {
                entities.push(EntitySpan {
                    text: text[start..end].to_string(),
                    start,
                    end,
                    entity_type: SKILL_ENTITY_TYPE.to_string(),
                });
            }
        }

        Ok(resolve_overlaps(entities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillex_core::Category;

    #[test]
    fn test_dictionary_ner_from_seeds() {
        let seeds = SeedList::new(["python", "sql"], ["communication"]);
        let ner = DictionaryNer::from_seeds(&seeds);
        assert_eq!(ner.len(), 3);

        let text = "Strong Python experience. Good communication skills. MySQL is a plus.";
        let entities = ner.run(text).unwrap();

        let texts: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
        // "SQL" inside "MySQL" is not a whole word
        assert_eq!(texts, vec!["Python", "communication"]);
        assert!(entities.iter().all(|e| e.entity_type == "SKILL"));
        assert_eq!((entities[0].start, entities[0].end), (7, 13));
    }

    #[test]
    fn test_longest_term_wins() {
        let mut ner = DictionaryNer::new();
        ner.add_term("learning");
        ner.add_term("Machine Learning");

        let entities = ner.run("Deep machine learning models").unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "machine learning");
    }

    #[test]
    fn test_add_term_deduplicates() {
        let mut ner = DictionaryNer::new();
        assert!(ner.add_term("Rust"));
        assert!(!ner.add_term(" rust "));
        assert!(!ner.add_term("   "));
        assert_eq!(ner.len(), 1);
    }

    #[test]
    fn test_with_rows() {
        let rows = vec![
            SpanRow {
                text: "Kubernetes".to_string(),
                label: Category::Technical,
            },
            SpanRow {
                text: "kubernetes".to_string(),
                label: Category::Unknown,
            },
        ];
        let ner = DictionaryNer::new().with_rows(&rows);
        assert_eq!(ner.len(), 1);

        let entities = ner.run("Deploy on kubernetes clusters").unwrap();
        assert_eq!(entities[0].text, "kubernetes");
    }

    #[test]
    fn test_empty_dictionary() {
        let ner = DictionaryNer::new();
        assert!(ner.is_empty());
        assert!(ner.run("Python").unwrap().is_empty());
    }
}
