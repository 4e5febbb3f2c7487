//! Per-answer processing: sentences, words, clusters, then one atomic commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::clusters::{ClusterAssigner, resolve_candidates};
use crate::error::Result;
use crate::extract::extract_words;
use crate::language::{LanguageRegistry, answer_language};
use crate::model::{AnswerId, Cluster, OTHER_CLUSTER, SentenceSentiment, SurveyId};
use crate::sentiment::SentimentScorer;
use crate::store::{AnswerCommit, CommitOutcome, NewWord, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyProcessed,
    EmptyText,
    /// Scoring produced no sentences; the answer stays unprocessed and can be retried.
    NoSentences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ProcessOutcome {
    Processed { sentences: usize, words: usize },
    Skipped { reason: SkipReason },
}

/// Result of a survey-wide batch. The batch itself never fails on item errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub survey_id: SurveyId,
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

pub struct ResponseProcessor {
    store: Arc<dyn Store>,
    registry: Arc<LanguageRegistry>,
    scorer: Arc<dyn SentimentScorer>,
    assigner: ClusterAssigner,
}

impl ResponseProcessor {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<LanguageRegistry>,
        scorer: Arc<dyn SentimentScorer>,
        assigner: ClusterAssigner,
    ) -> Self {
        ResponseProcessor {
            store,
            registry,
            scorer,
            assigner,
        }
    }

    pub fn process_answer(&self, answer_id: AnswerId) -> Result<ProcessOutcome> {
        let answer = self.store.answer(answer_id)?;
        if answer.processed {
            return Ok(skipped(SkipReason::AlreadyProcessed));
        }
        let Some(text) = answer.text() else {
            debug!("Answer {} has no text; skipping", answer_id);
            return Ok(skipped(SkipReason::EmptyText));
        };
        let response = self.store.response(answer.response_id)?;
        let survey = self.store.survey(response.survey_id)?;
        let language = answer_language(response.language.as_deref(), text);

        let sentences = self.scorer.score_sentences(text, &language);
        if sentences.is_empty() {
            info!(
                "Answer {} produced no sentence sentiments; leaving it unprocessed",
                answer_id
            );
            return Ok(skipped(SkipReason::NoSentences));
        }

        let resources = self.registry.get_or_load(&language);
        let (words, sentence_of) = words_by_sentence(&sentences, |s| extract_words(s, &resources));

        let candidates = resolve_candidates(&self.store.clusters()?, Some(&survey));
        let mapping = if words.is_empty() {
            HashMap::new()
        } else {
            self.assigner
                .assign(text, &words, &language, &candidates.names)
        };

        let mut clusters: HashMap<String, Cluster> = HashMap::new();
        let mut new_words = Vec::with_capacity(words.len());
        for word in &words {
            let name = mapping
                .get(word)
                .map(String::as_str)
                .unwrap_or(OTHER_CLUSTER);
            let cluster = match clusters.get(name) {
                Some(cluster) => cluster.clone(),
                None => {
                    let cluster = self.store.get_or_create_cluster(name, &survey.creator)?;
                    clusters.insert(name.to_string(), cluster.clone());
                    cluster
                }
            };
            let sentence = &sentences[sentence_of[word]];
            new_words.push(NewWord {
                word: word.clone(),
                source_text: text.to_string(),
                language: language.clone(),
                sentence_text: sentence.text.clone(),
                sentence_index: Some(sentence.index),
                sentiment: sentence.sentiment,
                cluster_name: cluster.name.clone(),
                cluster_id: cluster.id,
            });
        }

        let sentence_count = sentences.len();
        let outcome = self.store.commit_processed_answer(AnswerCommit {
            answer_id,
            sentences,
            words: new_words,
            processed_at: Utc::now(),
        })?;
        match outcome {
            CommitOutcome::Committed { words } => {
                debug!(
                    "Answer {} processed: sentences={} words={} clusters={}",
                    answer_id,
                    sentence_count,
                    words,
                    clusters.len()
                );
                Ok(ProcessOutcome::Processed {
                    sentences: sentence_count,
                    words,
                })
            }
            CommitOutcome::AlreadyProcessed => Ok(skipped(SkipReason::AlreadyProcessed)),
        }
    }

    /// Processes every unprocessed answer of a survey in parallel.
    ///
    /// Only an unknown survey fails the call; per-answer errors are collected.
    pub fn process_survey(&self, survey_id: SurveyId) -> Result<BatchReport> {
        let start = Instant::now();
        let pending = self.store.unprocessed_answers(survey_id)?;
        info!(
            "Processing survey {}: {} unprocessed answers",
            survey_id,
            pending.len()
        );

        let results: Vec<(AnswerId, Result<ProcessOutcome>)> = pending
            .par_iter()
            .map(|id| (*id, self.process_answer(*id)))
            .collect();

        let mut report = BatchReport {
            survey_id,
            total: pending.len(),
            processed: 0,
            skipped: 0,
            errors: Vec::new(),
        };
        for (answer_id, result) in results {
            match result {
                Ok(ProcessOutcome::Processed { .. }) => report.processed += 1,
                Ok(ProcessOutcome::Skipped { .. }) => report.skipped += 1,
                Err(e) => {
                    warn!("Answer {} failed: {}", answer_id, e);
                    report.errors.push(format!("answer {answer_id}: {e}"));
                }
            }
        }

        info!(
            "Survey {} batch finished in {:.2}s: processed={}/{} skipped={} errors={}",
            survey_id,
            start.elapsed().as_secs_f32(),
            report.processed,
            report.total,
            report.skipped,
            report.errors.len()
        );
        Ok(report)
    }
}

fn skipped(reason: SkipReason) -> ProcessOutcome {
    ProcessOutcome::Skipped { reason }
}

/// Words in order of first appearance, plus the position in `sentences` of the
/// last sentence each word appeared in.
///
/// A word repeated across sentences keeps only its last sentence.
pub fn words_by_sentence<F>(
    sentences: &[SentenceSentiment],
    mut extract: F,
) -> (Vec<String>, BTreeMap<String, usize>)
where
    F: FnMut(&str) -> Vec<String>,
{
    let mut order = Vec::new();
    let mut sentence_of = BTreeMap::new();
    for (position, sentence) in sentences.iter().enumerate() {
        for word in extract(&sentence.text) {
            if sentence_of.insert(word.clone(), position).is_none() {
                order.push(word);
            }
        }
    }
    (order, sentence_of)
}
