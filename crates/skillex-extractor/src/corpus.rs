//! Weak-supervision corpus builder
//!
//! Turns raw records into NER training examples and a flat table of
//! (span text, category) rows for classifier training. Each record is
//! annotated by exactly one source, chosen by precedence:
//! 1. pre-annotated entities (authoritative when present)
//! 2. delimited skill list (authoritative when it matches anything)
//! 3. seed-list fallback

use serde::{Deserialize, Serialize};
use serde_json::Value;

use skillex_core::{
    Category, CorpusConfig, LabeledSpan, RawRecord, Result, SeedList, SpanRow, TrainingExample,
};

use crate::span::{char_span_to_bytes, find_occurrences, resolve_overlaps, PhraseMatcher};

// ============================================================================
// Annotation sources
// ============================================================================

/// One entry of a record's pre-annotated `entities` column.
/// Offsets count characters, as written by annotation tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub meta_label: Option<String>,
}

impl EntityAnnotation {
    /// Read one entry of the `entities` array.
    ///
    /// Offsets may be JSON integers or integer strings. Returns `None` for
    /// a missing, negative or non-integer offset.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            start: offset(value.get("start"))?,
            end: offset(value.get("end"))?,
            meta_label: value
                .get("meta_label")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

fn offset(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parsed `entities` column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityList {
    pub entries: Vec<EntityAnnotation>,
    /// Entries whose offsets could not be read
    pub malformed: usize,
}

/// One `phrase[:category]` token of a record's `skills` column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillToken {
    pub phrase: String,
    /// Explicit category, `None` when it has to be guessed from the seeds
    pub category: Option<Category>,
}

/// Which annotation strategy produced a record's spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Entities,
    SkillList,
    SeedFallback,
}

/// Annotation source selected for a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationSource {
    Entities(EntityList),
    SkillList(Vec<SkillToken>),
    SeedFallback,
}

impl AnnotationSource {
    /// Pick the highest-precedence source available on `record`.
    ///
    /// Unparseable or empty `entities` and blank `skills` count as absent.
    pub fn from_record(record: &RawRecord, config: &CorpusConfig) -> Self {
        if let Some(entities) = record.entities.as_deref().and_then(parse_entities) {
            return Self::Entities(entities);
        }

        if let Some(skills) = non_blank(record.skills.as_deref()) {
            let tokens = parse_skill_tokens(
                skills,
                &config.skills_delimiter,
                &config.label_separator,
            );
            if !tokens.is_empty() {
                return Self::SkillList(tokens);
            }
        }

        Self::SeedFallback
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Entities(_) => Strategy::Entities,
            Self::SkillList(_) => Strategy::SkillList,
            Self::SeedFallback => Strategy::SeedFallback,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse the JSON `entities` column.
///
/// `None` if the cell is not a JSON array or the array is empty. Entries
/// are read one by one; a bad entry is counted and skipped.
pub fn parse_entities(raw: &str) -> Option<EntityList> {
    if raw.trim().is_empty() {
        return None;
    }
    let values = match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(values) if !values.is_empty() => values,
        Ok(_) => return None,
        Err(e) => {
            tracing::debug!("Ignoring malformed entities column: {}", e);
            return None;
        }
    };

    let mut list = EntityList::default();
    for value in &values {
        match EntityAnnotation::from_value(value) {
            Some(entity) => list.entries.push(entity),
            None => {
                tracing::debug!("Dropping unreadable entity {}", value);
                list.malformed += 1;
            }
        }
    }
    Some(list)
}

/// Split a `skills` cell into tokens, dropping blank ones
pub fn parse_skill_tokens(raw: &str, delimiter: &str, separator: &str) -> Vec<SkillToken> {
    raw.split(delimiter)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| match token.split_once(separator) {
            Some((phrase, label)) => SkillToken {
                phrase: phrase.trim().to_string(),
                category: Some(Category::from_label(label)),
            },
            None => SkillToken {
                phrase: token.to_string(),
                category: None,
            },
        })
        .collect()
}

// ============================================================================
// Per-record annotation
// ============================================================================

/// Outcome of annotating a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordAnnotation {
    pub strategy: Strategy,
    /// Training example, `None` if no valid span was found
    pub example: Option<TrainingExample>,
    /// Classifier rows for every contributing span, overlap losers included
    pub rows: Vec<SpanRow>,
    /// Pre-annotated spans dropped as out-of-bounds or empty
    pub invalid_spans: usize,
    /// Spans dropped by overlap resolution
    pub overlapping_spans: usize,
}

/// Counters for a corpus build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub records: usize,
    pub rejected_records: usize,
    pub unannotated_records: usize,
    pub from_entities: usize,
    pub from_skill_list: usize,
    pub from_seeds: usize,
    pub span_rows: usize,
    pub invalid_spans: usize,
    pub overlapping_spans: usize,
}

impl CorpusStats {
    /// Number of training examples produced
    pub fn examples(&self) -> usize {
        self.from_entities + self.from_skill_list + self.from_seeds
    }

    fn record(&mut self, annotation: &RecordAnnotation) {
        self.records += 1;
        self.span_rows += annotation.rows.len();
        self.invalid_spans += annotation.invalid_spans;
        self.overlapping_spans += annotation.overlapping_spans;

        if annotation.example.is_none() {
            self.unannotated_records += 1;
            return;
        }
        match annotation.strategy {
            Strategy::Entities => self.from_entities += 1,
            Strategy::SkillList => self.from_skill_list += 1,
            Strategy::SeedFallback => self.from_seeds += 1,
        }
    }
}

/// Result of a corpus build, in record order
#[derive(Debug, Clone, Default)]
pub struct CorpusOutput {
    pub examples: Vec<TrainingExample>,
    pub rows: Vec<SpanRow>,
    pub stats: CorpusStats,
}

impl CorpusOutput {
    /// Split the examples into train/dev by position
    pub fn split(&self, ratio: f64) -> (&[TrainingExample], &[TrainingExample]) {
        let at = split_index(self.examples.len(), ratio);
        self.examples.split_at(at)
    }
}

// ============================================================================
// Corpus builder
// ============================================================================

/// Builds NER examples and classifier rows from raw records
pub struct CorpusBuilder {
    seeds: SeedList,
    seed_matchers: Vec<(PhraseMatcher, Category)>,
    config: CorpusConfig,
}

impl CorpusBuilder {
    /// Create a builder over a fixed seed list
    pub fn new(seeds: SeedList, config: CorpusConfig) -> Self {
        let seed_matchers = seeds
            .phrases()
            .filter_map(|(phrase, category)| {
                PhraseMatcher::new(phrase).map(|matcher| (matcher, category))
            })
            .collect();

        Self {
            seeds,
            seed_matchers,
            config,
        }
    }

    pub fn seeds(&self) -> &SeedList {
        &self.seeds
    }

    /// Annotate one record with the highest-precedence source that applies
    pub fn annotate(&self, record: &RawRecord) -> RecordAnnotation {
        let text = record.description.as_str();
        let source = AnnotationSource::from_record(record, &self.config);

        let (strategy, spans, invalid_spans) = match source {
            AnnotationSource::Entities(entities) => {
                let (spans, invalid) = self.spans_from_entities(text, &entities.entries);
                (Strategy::Entities, spans, invalid + entities.malformed)
            }
            AnnotationSource::SkillList(tokens) => {
                let spans = self.spans_from_skill_list(text, &tokens);
                if spans.is_empty() {
                    tracing::debug!("Skill list matched nothing, falling back to seeds");
                    (Strategy::SeedFallback, self.spans_from_seeds(text), 0)
                } else {
                    (Strategy::SkillList, spans, 0)
                }
            }
            AnnotationSource::SeedFallback => {
                (Strategy::SeedFallback, self.spans_from_seeds(text), 0)
            }
        };

        let rows: Vec<SpanRow> = spans.iter().map(SpanRow::from).collect();
        let candidates = spans.len();
        let resolved = resolve_overlaps(spans);
        let overlapping_spans = candidates - resolved.len();

        tracing::debug!(
            "{:?}: {} candidate span(s), {} kept, {} invalid",
            strategy,
            candidates,
            resolved.len(),
            invalid_spans
        );

        let example = (!resolved.is_empty()).then(|| TrainingExample {
            text: text.to_string(),
            spans: resolved,
        });

        RecordAnnotation {
            strategy,
            example,
            rows,
            invalid_spans,
            overlapping_spans,
        }
    }

    /// Build a corpus from records in order.
    ///
    /// Records that failed to load are counted as rejected and skipped.
    pub fn build<I>(&self, records: I) -> CorpusOutput
    where
        I: IntoIterator<Item = Result<RawRecord>>,
    {
        let mut output = CorpusOutput::default();

        for (index, record) in records.into_iter().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Rejecting record {}: {}", index, e);
                    output.stats.rejected_records += 1;
                    continue;
                }
            };

            let annotation = self.annotate(&record);
            output.stats.record(&annotation);
            output.rows.extend(annotation.rows);
            if let Some(example) = annotation.example {
                output.examples.push(example);
            }
        }

        tracing::info!(
            "Built {} documents and {} labeled skill spans from {} records",
            output.examples.len(),
            output.rows.len(),
            output.stats.records
        );

        output
    }

    fn spans_from_entities(
        &self,
        text: &str,
        entities: &[EntityAnnotation],
    ) -> (Vec<LabeledSpan>, usize) {
        let mut spans = Vec::with_capacity(entities.len());
        let mut invalid = 0;

        for entity in entities {
            let Some((start, end)) = char_span_to_bytes(text, entity.start, entity.end) else {
                tracing::debug!(
                    "Dropping entity [{}, {}) outside a {}-char text",
                    entity.start,
                    entity.end,
                    text.chars().count()
                );
                invalid += 1;
                continue;
            };

            let category = match non_blank(entity.meta_label.as_deref()) {
                Some(label) => Category::from_label(label),
                None => self.seeds.guess_label(&text[start..end]),
            };

            match LabeledSpan::from_source(text, start, end, category) {
                Some(span) => spans.push(span),
                None => invalid += 1,
            }
        }

        (spans, invalid)
    }

    fn spans_from_skill_list(&self, text: &str, tokens: &[SkillToken]) -> Vec<LabeledSpan> {
        let mut spans = Vec::new();

        for token in tokens {
            let category = token
                .category
                .unwrap_or_else(|| self.seeds.guess_label(&token.phrase));

            spans.extend(
                find_occurrences(text, &token.phrase)
                    .into_iter()
                    .filter_map(|(start, end)| LabeledSpan::from_source(text, start, end, category)),
            );
        }

        spans
    }

    fn spans_from_seeds(&self, text: &str) -> Vec<LabeledSpan> {
        let mut spans = Vec::new();

        for (matcher, category) in &self.seed_matchers {
            spans.extend(
                matcher
                    .find_in(text)
                    .into_iter()
                    .filter_map(|(start, end)| LabeledSpan::from_source(text, start, end, *category)),
            );
        }

        spans
    }
}

// ============================================================================
// Train/dev split
// ============================================================================

fn split_index(len: usize, ratio: f64) -> usize {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    ((len as f64 * ratio).floor() as usize).min(len)
}

/// Split items into (train, dev) at `floor(len * ratio)`, keeping order
pub fn split_train_dev<T>(mut items: Vec<T>, ratio: f64) -> (Vec<T>, Vec<T>) {
    let at = split_index(items.len(), ratio);
    let dev = items.split_off(at);
    (items, dev)
}

// ============================================================================
// Tests
// ============================================================================
