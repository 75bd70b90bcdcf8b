//! Seed lists for weak supervision
//!
//! Two disjoint phrase sets, technical and soft. Phrases are stored
//! lowercased and trimmed; a phrase listed in both sets is kept as
//! technical only.

use std::collections::BTreeSet;

use crate::Category;

/// Immutable technical/soft seed vocabulary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedList {
    technical: BTreeSet<String>,
    soft: BTreeSet<String>,
}

impl SeedList {
    /// Build a seed list from raw phrases
    pub fn new<T, S>(technical: T, soft: S) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let technical: BTreeSet<String> = technical
            .into_iter()
            .filter_map(|p| normalize_phrase(p.as_ref()))
            .collect();

        let mut shared = 0usize;
        let soft: BTreeSet<String> = soft
            .into_iter()
            .filter_map(|p| normalize_phrase(p.as_ref()))
            .filter(|p| {
                let keep = !technical.contains(p);
                if !keep {
                    shared += 1;
                }
                keep
            })
            .collect();

        if shared > 0 {
            tracing::warn!(
                "{} phrase(s) listed as both technical and soft, keeping technical",
                shared
            );
        }

        Self { technical, soft }
    }

    /// Technical phrases in lexical order
    pub fn technical(&self) -> impl Iterator<Item = &str> {
        self.technical.iter().map(String::as_str)
    }

    /// Soft phrases in lexical order
    pub fn soft(&self) -> impl Iterator<Item = &str> {
        self.soft.iter().map(String::as_str)
    }

    /// All phrases with their category, technical first
    pub fn phrases(&self) -> impl Iterator<Item = (&str, Category)> {
        self.technical()
            .map(|p| (p, Category::Technical))
            .chain(self.soft().map(|p| (p, Category::Soft)))
    }

    /// Look up the category of a phrase after normalization
    pub fn guess_label(&self, phrase: &str) -> Category {
        let normalized = phrase.trim().to_lowercase();
        if self.technical.contains(&normalized) {
            Category::Technical
        } else if self.soft.contains(&normalized) {
            Category::Soft
        } else {
            Category::Unknown
        }
    }

    pub fn len(&self) -> usize {
        self.technical.len() + self.soft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technical.is_empty() && self.soft.is_empty()
    }
}

fn normalize_phrase(phrase: &str) -> Option<String> {
    let normalized = phrase.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}
