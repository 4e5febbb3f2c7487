//! # survey_insights
//!
//! Turns free-text survey answers into structured insight: sentence-level
//! sentiment, significant words, thematic clusters and survey-wide
//! satisfaction summaries.
//!
//! The flow is answer → sentences with sentiment → words → clusters → one
//! atomic commit, followed by a full recompute of the survey summary.
//! Persistence goes through the [`Store`] trait; [`MemoryStore`] keeps the
//! data in memory and reads/writes a JSON snapshot.
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use chrono::Utc;
//! use survey_insights::{
//!     Answer, DisabledClassifier, LanguageRegistry, MemoryStore, Pipeline, QuestionKind,
//!     Response, SentimentStrategy, Survey,
//! };
//!
//! let store = MemoryStore::new();
//! store.insert_survey(Survey {
//!     id: 1,
//!     title: "Hotel".into(),
//!     creator: "ops".into(),
//!     template_id: None,
//! }).unwrap();
//! store.insert_response(Response {
//!     id: 1,
//!     survey_id: 1,
//!     language: Some("en".into()),
//!     submitted_at: Utc::now(),
//! }).unwrap();
//! store.insert_answer(Answer {
//!     id: 1,
//!     response_id: 1,
//!     question_kind: QuestionKind::Text,
//!     text_answer: Some("The breakfast was excellent. The room was dirty.".into()),
//!     nps_rating: None,
//!     processed: false,
//!     sentence_sentiments: Vec::new(),
//! }).unwrap();
//!
//! let pipeline = Pipeline::new(
//!     Arc::new(store),
//!     Arc::new(LanguageRegistry::default()),
//!     Arc::new(DisabledClassifier),
//!     SentimentStrategy::Lexicon,
//! );
//! let report = pipeline.process_survey(1).unwrap();
//! assert_eq!(report.processed, 1);
//! let summary = pipeline.recompute(1).unwrap();
//! assert_eq!(summary.response_count, 1);
//! ```

pub mod aggregate;
pub mod classifier;
pub mod clusters;
pub mod error;
pub mod export;
pub mod extract;
pub mod language;
mod lexicon;
pub mod model;
pub mod pipeline;
pub mod processor;
pub mod sentiment;
pub mod store;

pub use aggregate::{SurveyAggregator, compute_summary};
pub use classifier::{
    ClassifierConfig, DisabledClassifier, HttpClassifier, TextClassifier, classifier_from_config,
};
pub use clusters::{ClusterAssigner, ClusterMapping, parse_cluster_response, resolve_candidates};
pub use error::{ClassifierError, PipelineError, Result};
pub use export::{ExportFormat, csv_safe_cell, export_survey};
pub use extract::{count_words, extract_words, sort_map_to_vec};
pub use language::{LanguageRegistry, LanguageResources, ResourceOptions};
pub use model::*;
pub use pipeline::Pipeline;
pub use processor::{BatchReport, ProcessOutcome, ResponseProcessor, SkipReason};
pub use sentiment::{SentimentScorer, SentimentStrategy};
pub use store::{MemoryStore, Snapshot, Store};
