//! Skillex CLI - Command-line interface
//!
//! Usage:
//!   skillex build-corpus --records <csv|jsonl> --train <jsonl> --dev <jsonl> --spans <csv>
//!   skillex preannotate --records <csv> --out <jsonl>
//!   skillex train-classifier --spans <csv> --out <json>
//!   skillex extract --text <str>
//!   skillex evaluate --dev <jsonl>

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use skillex_core::{AppConfig, LoggingConfig, SeedList};
use skillex_extractor::dataset::{self, BuildManifest};
use skillex_extractor::metrics::{AggregateMetrics, Evaluator, GoldSpan};
use skillex_extractor::preannotate::Preannotator;
use skillex_extractor::{
    CorpusBuilder, DictionaryNer, LexiconClassifier, SkillPipeline, SpanClassifier, TrainingSet,
};

#[derive(Parser)]
#[command(name = "skillex")]
#[command(about = "Skill corpus builder and extraction pipeline")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build NER training data and the classifier table from raw records
    BuildCorpus {
        /// Records as CSV, or doccano JSONL
        #[arg(long)]
        records: PathBuf,
        #[arg(long)]
        train: PathBuf,
        #[arg(long)]
        dev: PathBuf,
        /// Classifier table output
        #[arg(long)]
        spans: PathBuf,
        /// Optional build summary
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Label seed phrase hits for the annotation tool
    Preannotate {
        #[arg(long)]
        records: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Fit the span classifier from a classifier table
    TrainClassifier {
        #[arg(long)]
        spans: PathBuf,
        /// Defaults to the configured model path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Extract skills from a text and print them as JSON
    Extract {
        #[command(flatten)]
        input: TextInput,
        #[arg(long)]
        classifier: Option<PathBuf>,
        /// Classifier table whose surface forms extend the tagger vocabulary
        #[arg(long)]
        vocab: Option<PathBuf>,
    },
    /// Score the dictionary tagger against a dev file
    Evaluate {
        #[arg(long)]
        dev: PathBuf,
        #[arg(long)]
        vocab: Option<PathBuf>,
        /// Require exact offsets instead of matching text
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TextInput {
    #[arg(long)]
    text: Option<String>,
    #[arg(long)]
    file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::BuildCorpus {
            records,
            train,
            dev,
            spans,
            manifest,
        } => build_corpus(&config, &records, &train, &dev, &spans, manifest.as_deref()),
        Commands::Preannotate { records, out } => preannotate(&config, &records, &out),
        Commands::TrainClassifier { spans, out } => {
            let out = out.unwrap_or_else(|| config.classifier.model_path.clone());
            train_classifier(&config, &spans, &out)
        }
        Commands::Extract {
            input,
            classifier,
            vocab,
        } => extract(&config, input, classifier.as_deref(), vocab.as_deref()),
        Commands::Evaluate { dev, vocab, strict } => {
            evaluate(&config, &dev, vocab.as_deref(), strict)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_seeds(config: &AppConfig) -> anyhow::Result<SeedList> {
    dataset::load_seed_list(
        &config.corpus.technical_seed_path,
        &config.corpus.soft_seed_path,
    )
    .context("Failed to load seed lists")
}

fn build_corpus(
    config: &AppConfig,
    records: &Path,
    train: &Path,
    dev: &Path,
    spans: &Path,
    manifest: Option<&Path>,
) -> anyhow::Result<()> {
    let seeds = load_seeds(config)?;
    let inputs = dataset::read_records(records)
        .with_context(|| format!("Failed to read records from {}", records.display()))?;

    let builder = CorpusBuilder::new(seeds, config.corpus.clone());
    let output = builder.build(inputs);

    let ratio = config.corpus.train_ratio;
    let (train_examples, dev_examples) = output.split(ratio);
    dataset::write_examples(train, train_examples)?;
    dataset::write_examples(dev, dev_examples)?;
    dataset::write_span_table(spans, &output.rows)?;

    if let Some(path) = manifest {
        let summary = BuildManifest::new(
            records,
            ratio,
            train_examples.len(),
            dev_examples.len(),
            output.stats.clone(),
        );
        dataset::write_json(path, &summary)?;
    }

    println!(
        "Wrote {} train / {} dev documents and {} span rows ({} records rejected)",
        train_examples.len(),
        dev_examples.len(),
        output.rows.len(),
        output.stats.rejected_records
    );
    Ok(())
}

fn preannotate(config: &AppConfig, records: &Path, out: &Path) -> anyhow::Result<()> {
    let seeds = load_seeds(config)?;
    let mut texts = Vec::new();
    for record in dataset::read_records(records)? {
        match record {
            Ok(record) => texts.push(record.description),
            Err(e) => tracing::warn!("Skipping record: {}", e),
        }
    }

    let documents = Preannotator::new(&seeds).annotate_all(texts.iter().map(String::as_str));
    dataset::write_doccano(out, &documents)?;
    println!("Wrote {} documents to {}", documents.len(), out.display());
    Ok(())
}

fn train_classifier(config: &AppConfig, spans: &Path, out: &Path) -> anyhow::Result<()> {
    let rows = dataset::read_span_table(spans)
        .with_context(|| format!("Failed to read span table {}", spans.display()))?;
    let set = TrainingSet::from_rows(rows)?;
    let (train, test) = set.holdout(config.classifier.test_ratio, config.classifier.seed);

    let classifier = LexiconClassifier::fit(&train);
    classifier.save(out)?;

    println!(
        "Trained on {} of {} rows {:?}, saved to {}",
        train.len(),
        set.len(),
        set.class_counts(),
        out.display()
    );
    if test.is_empty() {
        tracing::warn!("No rows held out, skipping evaluation");
    } else {
        print!("{}", classifier.evaluate(&test).report());
    }
    Ok(())
}

fn build_tagger(config: &AppConfig, vocab: Option<&Path>) -> anyhow::Result<DictionaryNer> {
    let seeds = load_seeds(config)?;
    let mut ner = DictionaryNer::from_seeds(&seeds);
    if let Some(path) = vocab {
        let rows = dataset::read_span_table(path)
            .with_context(|| format!("Failed to read vocabulary {}", path.display()))?;
        ner = ner.with_rows(&rows);
    }
    if ner.is_empty() {
        tracing::warn!("Tagger vocabulary is empty, nothing will be extracted");
    }
    Ok(ner)
}

fn extract(
    config: &AppConfig,
    input: TextInput,
    classifier: Option<&Path>,
    vocab: Option<&Path>,
) -> anyhow::Result<()> {
    let text = match (input.text, input.file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Either --text or --file is required"),
    };

    let ner = build_tagger(config, vocab)?;

    // An explicit model must load; the configured default is optional
    let model = match classifier {
        Some(path) => Some(LexiconClassifier::load(path)?),
        None if config.classifier.model_path.exists() => {
            Some(LexiconClassifier::load(&config.classifier.model_path)?)
        }
        None => None,
    };

    let pipeline = SkillPipeline::new(&config.extraction);
    let skills = pipeline.extract_and_label(
        &text,
        &ner,
        model.as_ref().map(|m| m as &dyn SpanClassifier),
    )?;

    println!("{}", serde_json::to_string_pretty(&skills)?);
    Ok(())
}

fn evaluate(
    config: &AppConfig,
    dev: &Path,
    vocab: Option<&Path>,
    strict: bool,
) -> anyhow::Result<()> {
    let documents = dataset::read_examples(dev)
        .with_context(|| format!("Failed to read dev set {}", dev.display()))?;
    let ner = build_tagger(config, vocab)?;
    let pipeline = SkillPipeline::new(&config.extraction);

    let evaluator = if strict {
        Evaluator::new().strict()
    } else {
        Evaluator::new()
    };

    let mut aggregate = AggregateMetrics::default();
    for document in &documents {
        let predicted = pipeline.extract_and_label(&document.text, &ner, None)?;
        let gold = GoldSpan::from_document(document);
        aggregate.add(&evaluator.evaluate(&predicted, &gold));
    }

    print!("{}", aggregate.report());
    Ok(())
}
