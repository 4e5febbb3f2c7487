//! Persisted entities of the analysis pipeline.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type SurveyId = u64;
pub type ResponseId = u64;
pub type AnswerId = u64;
pub type ClusterId = u64;
pub type WordId = u64;

/// Sentinel cluster for words the classifier did not place.
pub const OTHER_CLUSTER: &str = "Other";

/// Sentiment cut-offs, one per context.
pub mod thresholds {
    /// Sentence-level categorisation and sentiment-mode satisfaction buckets.
    pub const SENTENCE: f64 = 0.05;
    /// Cluster category when no NPS data is available.
    pub const CLUSTER: f64 = 0.25;
    /// Word labels in exports.
    pub const EXPORT_WORD: f64 = 0.2;
    /// Cluster labels in exports.
    pub const EXPORT_CLUSTER: f64 = 0.3;
}

/// NPS promoter lower bound (inclusive).
pub const NPS_PROMOTER_MIN: f64 = 9.0;
/// NPS detractor upper bound (inclusive).
pub const NPS_DETRACTOR_MAX: f64 = 6.0;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// `score > threshold` is positive, `score < -threshold` is negative.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            SentimentLabel::Positive
        } else if score < -threshold {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Promoter/passive/detractor mapping of an average NPS rating.
    pub fn from_nps(rating: f64) -> Self {
        if rating >= NPS_PROMOTER_MIN {
            SentimentLabel::Positive
        } else if rating <= NPS_DETRACTOR_MAX {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Survey {
    pub id: SurveyId,
    pub title: String,
    /// Owner of clusters auto-created while processing this survey.
    pub creator: String,
    #[serde(default)]
    pub template_id: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub id: ResponseId,
    pub survey_id: SurveyId,
    /// ISO 639-1 code, a locale like `pt-BR`, `auto`, or nothing.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    Text,
    Nps,
}

/// One sentence of an answer with its score in [-1, 1].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SentenceSentiment {
    pub text: String,
    pub sentiment: f64,
    /// Position among the non-empty sentences of the answer.
    pub index: usize,
}

impl SentenceSentiment {
    pub fn label(&self) -> SentimentLabel {
        SentimentLabel::from_score(self.sentiment, thresholds::SENTENCE)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Answer {
    pub id: AnswerId,
    pub response_id: ResponseId,
    #[serde(default)]
    pub question_kind: QuestionKind,
    #[serde(default)]
    pub text_answer: Option<String>,
    /// 0..=10 for NPS questions.
    #[serde(default)]
    pub nps_rating: Option<u8>,
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub sentence_sentiments: Vec<SentenceSentiment>,
}

impl Answer {
    /// Trimmed text, or `None` when blank.
    pub fn text(&self) -> Option<&str> {
        self.text_answer
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// The rating of an NPS answer, capped at 10.
    pub fn nps(&self) -> Option<f64> {
        match self.question_kind {
            QuestionKind::Nps => self.nps_rating.map(|r| f64::from(r.min(10))),
            QuestionKind::Text => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExtractedWord {
    pub id: WordId,
    pub answer_id: AnswerId,
    pub response_id: ResponseId,
    pub survey_id: SurveyId,
    /// Lemma.
    pub word: String,
    /// Full answer text the word came from.
    pub source_text: String,
    pub language: String,
    pub sentence_text: String,
    #[serde(default)]
    pub sentence_index: Option<usize>,
    /// Copied from the owning sentence.
    pub sentiment: f64,
    #[serde(default = "other_cluster_name")]
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_ids: BTreeSet<ClusterId>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn other_cluster_name() -> String {
    OTHER_CLUSTER.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub owner: String,
    /// Scoped to a survey template.
    #[serde(default)]
    pub template_id: Option<u64>,
    /// Legacy survey-scoped cluster.
    #[serde(default)]
    pub survey_id: Option<SurveyId>,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub last_processed: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Cluster {
    /// Neither template- nor survey-scoped.
    pub fn is_global(&self) -> bool {
        self.template_id.is_none() && self.survey_id.is_none()
    }

    /// Scoped to the survey itself or to its template.
    pub fn is_scoped_to(&self, survey: &Survey) -> bool {
        self.survey_id == Some(survey.id)
            || (survey.template_id.is_some() && self.template_id == survey.template_id)
    }
}

/// Which data the survey-wide satisfaction figures were derived from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SatisfactionBasis {
    Nps,
    Sentiment,
    #[default]
    None,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClusterMetrics {
    pub name: String,
    pub frequency: usize,
    pub response_count: usize,
    pub sentence_count: usize,
    pub sentiment: f64,
    pub nps: Option<f64>,
    pub category: SentimentLabel,
    pub is_positive: bool,
    pub is_negative: bool,
    pub is_neutral: bool,
}

/// Materialised rollup for one survey. Always recomputed from scratch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SurveyAnalysisSummary {
    pub survey_id: SurveyId,
    pub response_count: usize,
    pub language_breakdown: BTreeMap<String, usize>,
    pub satisfaction_basis: SatisfactionBasis,
    pub average_satisfaction: Option<f64>,
    pub median_satisfaction: Option<f64>,
    pub satisfaction_confidence_low: Option<f64>,
    pub satisfaction_confidence_high: Option<f64>,
    /// Promoters% minus detractors% (or positive% minus negative%).
    pub satisfaction_score: Option<f64>,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub neutral_pct: f64,
    pub sentiment_divergence: Option<f64>,
    pub top_clusters: Vec<ClusterId>,
    pub top_positive_clusters: Vec<ClusterId>,
    pub top_negative_clusters: Vec<ClusterId>,
    pub top_neutral_clusters: Vec<ClusterId>,
    pub cluster_metrics: BTreeMap<ClusterId, ClusterMetrics>,
    pub updated_at: DateTime<Utc>,
}
