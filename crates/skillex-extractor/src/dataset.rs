//! Dataset readers and writers
//!
//! - Record sources: CSV with `description` and optional `entities` /
//!   `skills` columns, or doccano JSONL (`text` + `label` triples)
//! - Seed lists: header-less CSV, first column is the phrase
//! - NER training files: JSON Lines of text + SKILL spans
//! - Classifier table: CSV with a `text,label` header

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use skillex_core::{
    Category, RawRecord, Result, SeedList, SkillError, SpanRow, TrainingExample,
    SKILL_ENTITY_TYPE,
};

use crate::corpus::{CorpusStats, EntityAnnotation};

fn csv_error(path: &Path, err: csv::Error) -> SkillError {
    SkillError::Dataset(format!("{}: {}", path.display(), err))
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SkillError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| SkillError::io(path, e))?;
    Ok(BufWriter::new(file))
}

// ============================================================================
// Record sources
// ============================================================================

#[derive(Debug, Deserialize)]
struct RecordRow {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    entities: Option<String>,
    #[serde(default)]
    skills: Option<String>,
}

impl RecordRow {
    fn into_record(self) -> Result<RawRecord> {
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| SkillError::MissingField {
                field: "description".to_string(),
            })?;
        Ok(RawRecord {
            description,
            entities: self.entities.filter(|v| !v.trim().is_empty()),
            skills: self.skills.filter(|v| !v.trim().is_empty()),
        })
    }
}

/// Stream records from a CSV file with a header row.
///
/// Opening the file is fatal; a malformed row or a row without a
/// description is yielded as an error for that record only.
pub fn read_records_csv(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<RawRecord>>> {
    let path = path.as_ref().to_path_buf();
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&path)
        .map_err(|e| csv_error(&path, e))?;

    Ok(reader
        .into_deserialize::<RecordRow>()
        .enumerate()
        .map(move |(index, row)| {
            let row = row.map_err(|e| {
                SkillError::InvalidRecord(format!("{} row {}: {}", path.display(), index + 1, e))
            })?;
            row.into_record()
        }))
}

/// One line of a doccano export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoccanoDocument {
    pub text: String,
    #[serde(default)]
    pub label: Vec<(usize, usize, String)>,
}

#[derive(Debug, Deserialize)]
struct DoccanoLine {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    label: Vec<(usize, usize, String)>,
}

/// Convert one doccano JSONL line into a record with pre-annotated entities
pub fn parse_doccano_line(line: &str) -> Result<RawRecord> {
    let parsed: DoccanoLine = serde_json::from_str(line)?;
    let text = parsed.text.ok_or_else(|| SkillError::MissingField {
        field: "text".to_string(),
    })?;

    let entities: Vec<EntityAnnotation> = parsed
        .label
        .into_iter()
        .map(|(start, end, label)| EntityAnnotation {
            start,
            end,
            meta_label: Some(label),
        })
        .collect();

    let mut record = RawRecord::new(text);
    if !entities.is_empty() {
        record = record.with_entities(serde_json::to_string(&entities)?);
    }
    Ok(record)
}

/// Read a doccano JSONL export as records; blank lines are skipped
pub fn read_records_doccano(path: impl AsRef<Path>) -> Result<Vec<Result<RawRecord>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SkillError::io(path, e))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| SkillError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(parse_doccano_line(&line).map_err(|e| {
            SkillError::InvalidRecord(format!("{} line {}: {}", path.display(), index + 1, e))
        }));
    }
    Ok(records)
}

/// Read records from CSV, or from doccano JSONL when the extension is
/// `.jsonl`
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Result<RawRecord>>> {
    let path = path.as_ref();
    let is_jsonl = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));

    if is_jsonl {
        read_records_doccano(path)
    } else {
        Ok(read_records_csv(path)?.collect())
    }
}

// ============================================================================
// Seed lists
// ============================================================================

/// Read a seed phrase file. A missing file yields an empty list.
pub fn read_seed_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!("Seed file {} not found, using an empty list", path.display());
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut phrases = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        if let Some(phrase) = record.get(0).map(str::trim).filter(|p| !p.is_empty()) {
            phrases.push(phrase.to_lowercase());
        }
    }
    Ok(phrases)
}

/// Load the technical and soft seed files into a [`SeedList`]
pub fn load_seed_list(technical: impl AsRef<Path>, soft: impl AsRef<Path>) -> Result<SeedList> {
    let technical = read_seed_file(technical)?;
    let soft = read_seed_file(soft)?;
    let seeds = SeedList::new(technical, soft);
    tracing::info!(
        "Loaded {} technical and {} soft seed phrase(s)",
        seeds.technical().count(),
        seeds.soft().count()
    );
    Ok(seeds)
}

// ============================================================================
// NER training files
// ============================================================================

/// A SKILL span in a NER training file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerSpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// One line of a NER training file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerDocument {
    pub text: String,
    pub spans: Vec<NerSpan>,
}

impl From<&TrainingExample> for NerDocument {
    fn from(example: &TrainingExample) -> Self {
        Self {
            text: example.text.clone(),
            spans: example
                .spans
                .iter()
                .map(|span| NerSpan {
                    start: span.start,
                    end: span.end,
                    label: SKILL_ENTITY_TYPE.to_string(),
                })
                .collect(),
        }
    }
}

/// Write examples as JSON Lines
pub fn write_examples(path: impl AsRef<Path>, examples: &[TrainingExample]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = create_writer(path)?;
    for example in examples {
        serde_json::to_writer(&mut writer, &NerDocument::from(example))?;
        writer.write_all(b"\n").map_err(|e| SkillError::io(path, e))?;
    }
    writer.flush().map_err(|e| SkillError::io(path, e))?;
    tracing::info!("Saved {} document(s) to {}", examples.len(), path.display());
    Ok(())
}

/// Read a NER training file written by [`write_examples`]
pub fn read_examples(path: impl AsRef<Path>) -> Result<Vec<NerDocument>> {
    read_jsonl(path.as_ref())
}

fn read_jsonl<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| SkillError::io(path, e))?;
    let mut items = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| SkillError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|e| {
            SkillError::Dataset(format!("{} line {}: {}", path.display(), index + 1, e))
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Write doccano documents as JSON Lines
pub fn write_doccano(path: impl AsRef<Path>, documents: &[DoccanoDocument]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = create_writer(path)?;
    for document in documents {
        serde_json::to_writer(&mut writer, document)?;
        writer.write_all(b"\n").map_err(|e| SkillError::io(path, e))?;
    }
    writer.flush().map_err(|e| SkillError::io(path, e))
}

// ============================================================================
// Classifier table
// ============================================================================

#[derive(Debug, Deserialize)]
struct SpanTableRow {
    text: String,
    #[serde(default)]
    label: Option<String>,
}

/// Write the classifier table as CSV
pub fn write_span_table(path: impl AsRef<Path>, rows: &[SpanRow]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_writer(create_writer(path)?);
    for row in rows {
        writer.serialize(row).map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| SkillError::io(path, e))?;
    tracing::info!("Saved {} span row(s) to {}", rows.len(), path.display());
    Ok(())
}

/// Read a classifier table. Blank or unrecognized labels become `unknown`.
pub fn read_span_table(path: impl AsRef<Path>) -> Result<Vec<SpanRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;

    let mut rows = Vec::new();
    for row in reader.deserialize::<SpanTableRow>() {
        let row = row.map_err(|e| csv_error(path, e))?;
        rows.push(SpanRow {
            text: row.text,
            label: row
                .label
                .as_deref()
                .map(Category::from_label)
                .unwrap_or_default(),
        });
    }
    Ok(rows)
}

// ============================================================================
// Build manifest
// ============================================================================

/// Summary of a corpus build, written next to its outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub generated_at: DateTime<Utc>,
    pub records_path: PathBuf,
    pub train_ratio: f64,
    pub train_examples: usize,
    pub dev_examples: usize,
    pub stats: CorpusStats,
}

impl BuildManifest {
    pub fn new(
        records_path: impl Into<PathBuf>,
        train_ratio: f64,
        train_examples: usize,
        dev_examples: usize,
        stats: CorpusStats,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            records_path: records_path.into(),
            train_ratio,
            train_examples,
            dev_examples,
            stats,
        }
    }
}

/// Write any serializable value as pretty JSON
pub fn write_json(path: impl AsRef<Path>, value: &impl Serialize) -> Result<()> {
    let path = path.as_ref();
    let mut writer = create_writer(path)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n").map_err(|e| SkillError::io(path, e))?;
    writer.flush().map_err(|e| SkillError::io(path, e))
}

// ============================================================================
// Tests
// ============================================================================
