#![forbid(unsafe_code)]
//! # Survey Insights CLI
//!
//! Command-line trigger surface for the `survey_insights` crate. Every run
//! loads a JSON snapshot store, performs one operation and writes the store
//! back when the operation changed it.
//!
//! ## Commands
//! - `process`: analyse one answer or every unprocessed answer of a survey.
//! - `summarize`: print the survey summary, optionally forcing a recompute.
//! - `classify`: map a word list onto cluster names.
//! - `export`: write words, cluster metrics and word frequencies to CSV/TSV/JSON.
//!
//! ## Example
//! ```bash
//! RUST_LOG=info cargo run --release -- --data survey.json process --survey 1
//! cargo run --release -- --data survey.json export --survey 1 --format tsv --out reports
//! ```
//!
//! The external classifier is configured with `--classifier-url` (or
//! `SURVEY_CLASSIFIER_URL`). Without it, the `external` sentiment strategy
//! leaves answers unprocessed and every word is clustered as `Other`.

use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, warn};
use serde::Serialize;
use survey_insights::language::load_word_list;
use survey_insights::{
    ClassifierConfig, ExportFormat, MemoryStore, Pipeline, ResourceOptions, SentimentStrategy,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// JSON snapshot file with surveys, responses, answers, clusters and results
    #[arg(long)]
    data: PathBuf,

    /// Base URL of an OpenAI-compatible chat-completions service
    #[arg(long, env = "SURVEY_CLASSIFIER_URL")]
    classifier_url: Option<String>,

    /// Bearer token for the classification service
    #[arg(long, env = "SURVEY_CLASSIFIER_API_KEY", hide_env_values = true)]
    classifier_key: Option<String>,

    /// Model name sent to the classification service
    #[arg(long, env = "SURVEY_CLASSIFIER_MODEL", default_value = "gpt-4o-mini")]
    classifier_model: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    classifier_timeout: u64,

    /// Retries after a failed classifier request
    #[arg(long, default_value_t = 1)]
    classifier_retries: u32,

    /// Sentence sentiment strategy
    #[arg(long, value_enum, default_value = "lexicon")]
    sentiment: SentimentStrategy,

    /// Disable stemming; words are kept as lowercased tokens
    #[arg(long, default_value_t = false)]
    no_stem: bool,

    /// Optional path to additional stopword file (.txt, one word per line)
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Directory with <code>.txt stopword lists replacing the built-in ones
    #[arg(long)]
    stopwords_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyse unprocessed answers
    Process {
        /// Process every unprocessed answer of this survey
        #[arg(long, required_unless_present = "answer", conflicts_with = "answer")]
        survey: Option<u64>,

        /// Process a single answer
        #[arg(long)]
        answer: Option<u64>,
    },
    /// Print the survey summary as JSON
    Summarize {
        #[arg(long)]
        survey: u64,

        /// Rebuild the summary even if one is stored
        #[arg(long, default_value_t = false)]
        recompute: bool,
    },
    /// Map words onto cluster names
    Classify {
        /// Comma-separated word list
        #[arg(long, value_delimiter = ',', required = true)]
        words: Vec<String>,

        /// Answer text the words came from
        #[arg(long, default_value = "")]
        text: String,

        #[arg(long, default_value = "en")]
        language: String,

        /// Use this survey's cluster candidates instead of the global ones
        #[arg(long)]
        survey: Option<u64>,
    },
    /// Write words, clusters and word frequencies of a survey to files
    Export {
        #[arg(long)]
        survey: u64,

        /// Output format for export (csv, tsv, json)
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

impl Cli {
    fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            endpoint: self.classifier_url.clone(),
            api_key: self.classifier_key.clone(),
            model: self.classifier_model.clone(),
            timeout_secs: self.classifier_timeout,
            max_retries: self.classifier_retries,
        }
    }

    fn resource_options(&self) -> ResourceOptions {
        let extra_stopwords = match &self.stopwords {
            Some(path) => load_word_list(path).unwrap_or_else(|e| {
                warn!("Ignoring stopword file {}: {}", path.display(), e);
                HashSet::new()
            }),
            None => HashSet::new(),
        };
        ResourceOptions {
            stemming: !self.no_stem,
            stopwords_dir: self.stopwords_dir.clone(),
            extra_stopwords,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(MemoryStore::open(&cli.data)?);
    let pipeline = Pipeline::from_config(
        store.clone(),
        cli.resource_options(),
        &cli.classifier_config(),
        cli.sentiment,
    )?;

    let dirty = match &cli.command {
        Command::Process { survey, answer } => {
            match (survey, answer) {
                (Some(survey), _) => print_json(&pipeline.process_survey(*survey)?)?,
                (None, Some(answer)) => print_json(&pipeline.process_answer(*answer)?)?,
                (None, None) => return Err("either --survey or --answer is required".into()),
            }
            true
        }
        Command::Summarize { survey, recompute } => {
            let summary = if *recompute {
                pipeline.recompute(*survey)?
            } else {
                pipeline.summary(*survey)?
            };
            print_json(&summary)?;
            true
        }
        Command::Classify {
            words,
            text,
            language,
            survey,
        } => {
            let words: Vec<String> = words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect();
            let mapping = pipeline.classify(*survey, text, &words, language)?;
            print_json(&mapping.into_iter().collect::<BTreeMap<_, _>>())?;
            false
        }
        Command::Export {
            survey,
            format,
            out,
        } => {
            for path in pipeline.export(*survey, *format, out)? {
                println!("{}", path.display());
            }
            true
        }
    };

    if dirty {
        store.save(&cli.data)?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("Error: {}", e);
        process::exit(1);
    }
}
