//! Sentence segmentation and sentence-level sentiment scoring.
//!
//! Two interchangeable strategies implement [`SentimentScorer`]:
//! - [`LexiconScorer`]: local, deterministic compound score per sentence.
//! - [`ExternalScorer`]: one request to the text-classification service per answer.
//!
//! Both return sentences indexed by their position among the non-empty
//! sentences of the answer. An empty result means "not analysed yet".

use std::sync::Arc;

use clap::ValueEnum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::classifier::{TextClassifier, extract_json};
use crate::language::{LanguageRegistry, LanguageResources};
use crate::model::SentenceSentiment;

/// Normalisation constant of the compound score.
const ALPHA: f64 = 15.0;
const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCREMENT: f64 = 0.293;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 3;
const NEGATION_WINDOW: usize = 3;

const SENTIMENT_INSTRUCTIONS: &str = "You score the sentiment of survey answer sentences. \
For every sentence in the input list return an object with the exact sentence text and a \
sentiment_score between -1 (very negative) and 1 (very positive). Respond with JSON only: \
{\"sentences\": [{\"text\": \"...\", \"sentiment_score\": 0.0}]}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentStrategy {
    #[default]
    Lexicon,
    External,
}

pub trait SentimentScorer: Send + Sync {
    /// Scores every non-empty sentence of `text`.
    fn score_sentences(&self, text: &str, language: &str) -> Vec<SentenceSentiment>;
}

/// Splits `text` into indexed sentences without scores.
pub fn segment(text: &str, resources: &LanguageResources) -> Vec<(usize, String)> {
    resources.sentences(text).into_iter().enumerate().collect()
}

/// Compound polarity of one sentence in [-1, 1].
pub fn compound_score(sentence: &str, resources: &LanguageResources) -> f64 {
    let tokens: Vec<String> = resources
        .tokens(sentence)
        .into_iter()
        .map(str::to_lowercase)
        .collect();

    let mut sum = 0.0;
    for (i, token) in tokens.iter().enumerate() {
        let Some(mut valence) = resources.valence(token) else {
            continue;
        };
        if i > 0 && resources.is_booster(&tokens[i - 1]) {
            valence += BOOSTER_INCREMENT * valence.signum();
        }
        let window = &tokens[i.saturating_sub(NEGATION_WINDOW)..i];
        if window.iter().any(|t| resources.is_negator(t)) {
            valence *= NEGATION_SCALAR;
        }
        sum += valence;
    }

    if sum != 0.0 {
        let bangs = sentence.matches('!').count().min(MAX_EXCLAMATIONS) as f64;
        sum += bangs * EXCLAMATION_INCREMENT * sum.signum();
    }
    normalize(sum)
}

fn normalize(sum: f64) -> f64 {
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

pub struct LexiconScorer {
    registry: Arc<LanguageRegistry>,
}

impl LexiconScorer {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        LexiconScorer { registry }
    }
}

impl SentimentScorer for LexiconScorer {
    fn score_sentences(&self, text: &str, language: &str) -> Vec<SentenceSentiment> {
        let resources = self.registry.get_or_load(language);
        segment(text, &resources)
            .into_iter()
            .map(|(index, sentence)| SentenceSentiment {
                sentiment: compound_score(&sentence, &resources),
                text: sentence,
                index,
            })
            .collect()
    }
}

pub struct ExternalScorer {
    classifier: Arc<dyn TextClassifier>,
    registry: Arc<LanguageRegistry>,
}

impl ExternalScorer {
    pub fn new(classifier: Arc<dyn TextClassifier>, registry: Arc<LanguageRegistry>) -> Self {
        ExternalScorer {
            classifier,
            registry,
        }
    }
}

impl SentimentScorer for ExternalScorer {
    fn score_sentences(&self, text: &str, language: &str) -> Vec<SentenceSentiment> {
        let resources = self.registry.get_or_load(language);
        let sentences = resources.sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }
        let payload = json!({ "language": language, "sentences": sentences }).to_string();

        let raw = match self.classifier.complete(SENTIMENT_INSTRUCTIONS, &payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Sentiment request failed: {}", e);
                return Vec::new();
            }
        };
        match parse_sentiment_response(&raw) {
            Some(scored) => {
                debug!(
                    "External sentiment: {} sentences sent, {} scored",
                    sentences.len(),
                    scored.len()
                );
                scored
            }
            None => {
                warn!("Unparseable sentiment response ({} bytes)", raw.len());
                Vec::new()
            }
        }
    }
}

/// Reads `[{text, sentiment_score}]`, bare or under a `sentences`/`results` key.
///
/// Any malformed item rejects the whole response.
pub fn parse_sentiment_response(raw: &str) -> Option<Vec<SentenceSentiment>> {
    let value = extract_json(raw)?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("sentences")
            .or_else(|| map.get("results"))?
            .as_array()?,
        _ => return None,
    };

    let mut scored = Vec::with_capacity(items.len());
    for item in items {
        let text = item.get("text")?.as_str()?.trim();
        let score = item.get("sentiment_score")?.as_f64()?;
        if text.is_empty() {
            continue;
        }
        scored.push(SentenceSentiment {
            text: text.to_string(),
            sentiment: score.clamp(-1.0, 1.0),
            index: scored.len(),
        });
    }
    Some(scored)
}

/// Scorer for a strategy.
pub fn scorer_for(
    strategy: SentimentStrategy,
    registry: Arc<LanguageRegistry>,
    classifier: Arc<dyn TextClassifier>,
) -> Arc<dyn SentimentScorer> {
    match strategy {
        SentimentStrategy::Lexicon => Arc::new(LexiconScorer::new(registry)),
        SentimentStrategy::External => Arc::new(ExternalScorer::new(classifier, registry)),
    }
}
