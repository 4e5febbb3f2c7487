//! Survey-wide rollups, always recomputed from the current answers and words.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::info;
use serde::Serialize;

use crate::error::Result;
use crate::language::normalize_code;
use crate::model::{
    Answer, AnswerId, Cluster, ClusterId, ClusterMetrics, ExtractedWord, NPS_DETRACTOR_MAX,
    NPS_PROMOTER_MIN, Response, ResponseId, SatisfactionBasis, SentimentLabel,
    SurveyAnalysisSummary, SurveyId, WordId, thresholds,
};
use crate::store::Store;

/// z-score of a two-sided 95% interval.
pub const Z_95: f64 = 1.96;
/// Satisfaction values live on a 0..=10 scale.
pub const SCALE_MIN: f64 = 0.0;
pub const SCALE_MAX: f64 = 10.0;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (n - 1). A single value has no spread.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    if values.len() < 2 {
        return Some(0.0);
    }
    let var = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// `mean ± 1.96·stdev/√n`, clamped to the 0..=10 scale.
pub fn confidence_interval(mean: f64, stdev: f64, n: usize) -> (f64, f64) {
    if n == 0 {
        return (mean, mean);
    }
    let margin = Z_95 * stdev / (n as f64).sqrt();
    (
        (mean - margin).clamp(SCALE_MIN, SCALE_MAX),
        (mean + margin).clamp(SCALE_MIN, SCALE_MAX),
    )
}

fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatisfactionStats {
    pub basis: SatisfactionBasis,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub confidence_low: f64,
    pub confidence_high: f64,
    /// Promoters% − detractors% (NPS) or positive% − negative% (sentiment).
    pub score: f64,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub neutral_pct: f64,
    pub divergence: f64,
}

/// Statistics over NPS ratings (0..=10).
pub fn nps_satisfaction(ratings: &[f64]) -> Option<SatisfactionStats> {
    let avg = mean(ratings)?;
    let stdev = sample_stdev(ratings)?;
    let n = ratings.len();
    let (low, high) = confidence_interval(avg, stdev, n);
    let promoters = ratings.iter().filter(|r| **r >= NPS_PROMOTER_MIN).count();
    let detractors = ratings.iter().filter(|r| **r <= NPS_DETRACTOR_MAX).count();
    let passives = n - promoters - detractors;
    Some(SatisfactionStats {
        basis: SatisfactionBasis::Nps,
        count: n,
        mean: avg,
        median: median(ratings)?,
        confidence_low: low,
        confidence_high: high,
        score: pct(promoters, n) - pct(detractors, n),
        positive_pct: pct(promoters, n),
        negative_pct: pct(detractors, n),
        neutral_pct: pct(passives, n),
        divergence: stdev,
    })
}

/// Statistics over sentence sentiments mapped from [-1, 1] onto 0..=10.
///
/// Buckets use the sentence threshold (±0.05) on the raw scores and the
/// divergence is the spread of the raw scores.
pub fn sentiment_satisfaction(sentiments: &[f64]) -> Option<SatisfactionStats> {
    let mapped: Vec<f64> = sentiments.iter().map(|s| s * 5.0 + 5.0).collect();
    let avg = mean(&mapped)?;
    let stdev = sample_stdev(&mapped)?;
    let n = mapped.len();
    let (low, high) = confidence_interval(avg, stdev, n);
    let label = |s: f64| SentimentLabel::from_score(s, thresholds::SENTENCE);
    let positive = sentiments
        .iter()
        .filter(|s| label(**s) == SentimentLabel::Positive)
        .count();
    let negative = sentiments
        .iter()
        .filter(|s| label(**s) == SentimentLabel::Negative)
        .count();
    Some(SatisfactionStats {
        basis: SatisfactionBasis::Sentiment,
        count: n,
        mean: avg,
        median: median(&mapped)?,
        confidence_low: low,
        confidence_high: high,
        score: pct(positive, n) - pct(negative, n),
        positive_pct: pct(positive, n),
        negative_pct: pct(negative, n),
        neutral_pct: pct(n - positive - negative, n),
        divergence: sample_stdev(sentiments)?,
    })
}

/// Everything the aggregator reads for one survey.
pub struct SurveyData<'a> {
    pub survey_id: SurveyId,
    pub responses: &'a [Response],
    pub answers: &'a [Answer],
    pub words: &'a [ExtractedWord],
    pub clusters: &'a [Cluster],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SentenceKey {
    Indexed(AnswerId, usize),
    /// A word without sentence provenance stands for its own sentence.
    Loose(WordId),
}

#[derive(Default)]
struct ClusterAccumulator {
    name: Option<String>,
    responses: BTreeSet<ResponseId>,
    sentences: BTreeMap<SentenceKey, f64>,
}

/// Category by average NPS when present, else by sentiment at ±0.25.
pub fn cluster_category(nps: Option<f64>, sentiment: f64) -> SentimentLabel {
    match nps {
        Some(rating) => SentimentLabel::from_nps(rating),
        None => SentimentLabel::from_score(sentiment, thresholds::CLUSTER),
    }
}

/// Per-cluster metrics for every cluster touched by at least one word.
pub fn cluster_metrics(data: &SurveyData<'_>) -> BTreeMap<ClusterId, ClusterMetrics> {
    let answers: HashMap<AnswerId, &Answer> = data.answers.iter().map(|a| (a.id, a)).collect();
    let mut nps_by_response: HashMap<ResponseId, Vec<f64>> = HashMap::new();
    for answer in data.answers {
        if let Some(rating) = answer.nps() {
            nps_by_response
                .entry(answer.response_id)
                .or_default()
                .push(rating);
        }
    }

    let mut acc: BTreeMap<ClusterId, ClusterAccumulator> = BTreeMap::new();
    for word in data.words {
        let (key, sentiment) = match word.sentence_index {
            Some(index) => {
                let recorded = answers
                    .get(&word.answer_id)
                    .and_then(|a| a.sentence_sentiments.iter().find(|s| s.index == index))
                    .map(|s| s.sentiment);
                (
                    SentenceKey::Indexed(word.answer_id, index),
                    recorded.unwrap_or(word.sentiment),
                )
            }
            None => (SentenceKey::Loose(word.id), word.sentiment),
        };
        for cluster_id in &word.cluster_ids {
            let entry = acc.entry(*cluster_id).or_default();
            entry.name.get_or_insert_with(|| word.cluster_name.clone());
            entry.responses.insert(word.response_id);
            entry.sentences.insert(key, sentiment);
        }
    }

    let names: HashMap<ClusterId, &str> = data
        .clusters
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    acc.into_iter()
        .map(|(id, entry)| {
            let sentence_count = entry
                .sentences
                .keys()
                .filter(|k| matches!(k, SentenceKey::Indexed(..)))
                .count();
            let sentiments: Vec<f64> = entry.sentences.values().copied().collect();
            let ratings: Vec<f64> = entry
                .responses
                .iter()
                .filter_map(|r| nps_by_response.get(r))
                .flatten()
                .copied()
                .collect();
            let sentiment = mean(&sentiments).unwrap_or(0.0);
            let nps = mean(&ratings);
            let category = cluster_category(nps, sentiment);
            let name = names
                .get(&id)
                .map(|n| n.to_string())
                .or(entry.name)
                .unwrap_or_default();
            let metrics = ClusterMetrics {
                name,
                frequency: entry.responses.len().max(sentence_count),
                response_count: entry.responses.len(),
                sentence_count,
                sentiment,
                nps,
                category,
                is_positive: category == SentimentLabel::Positive,
                is_negative: category == SentimentLabel::Negative,
                is_neutral: category == SentimentLabel::Neutral,
            };
            (id, metrics)
        })
        .collect()
}

/// Cluster ids by frequency, descending; equal frequencies by ascending id.
pub fn rank_clusters(
    metrics: &BTreeMap<ClusterId, ClusterMetrics>,
    category: Option<SentimentLabel>,
) -> Vec<ClusterId> {
    let mut ranked: Vec<(ClusterId, usize)> = metrics
        .iter()
        .filter(|(_, m)| category.is_none_or(|c| m.category == c))
        .map(|(id, m)| (*id, m.frequency))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(id, _)| id).collect()
}

fn language_breakdown(data: &SurveyData<'_>) -> BTreeMap<String, usize> {
    let mut detected: HashMap<ResponseId, &str> = HashMap::new();
    for word in data.words {
        detected.entry(word.response_id).or_insert(&word.language);
    }
    let mut breakdown = BTreeMap::new();
    for response in data.responses {
        let declared = response
            .language
            .as_deref()
            .map(normalize_code)
            .filter(|c| !c.is_empty() && c != "auto");
        let code = declared
            .or_else(|| detected.get(&response.id).map(|c| c.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        *breakdown.entry(code).or_insert(0) += 1;
    }
    breakdown
}

/// Builds a complete summary from raw survey data.
pub fn compute_summary(data: &SurveyData<'_>) -> SurveyAnalysisSummary {
    let metrics = cluster_metrics(data);

    let ratings: Vec<f64> = data.answers.iter().filter_map(Answer::nps).collect();
    let stats = if ratings.is_empty() {
        let sentiments: Vec<f64> = data
            .answers
            .iter()
            .flat_map(|a| a.sentence_sentiments.iter().map(|s| s.sentiment))
            .collect();
        sentiment_satisfaction(&sentiments)
    } else {
        nps_satisfaction(&ratings)
    };

    SurveyAnalysisSummary {
        survey_id: data.survey_id,
        response_count: data.responses.len(),
        language_breakdown: language_breakdown(data),
        satisfaction_basis: stats.as_ref().map_or(SatisfactionBasis::None, |s| s.basis),
        average_satisfaction: stats.as_ref().map(|s| s.mean),
        median_satisfaction: stats.as_ref().map(|s| s.median),
        satisfaction_confidence_low: stats.as_ref().map(|s| s.confidence_low),
        satisfaction_confidence_high: stats.as_ref().map(|s| s.confidence_high),
        satisfaction_score: stats.as_ref().map(|s| s.score),
        positive_pct: stats.as_ref().map_or(0.0, |s| s.positive_pct),
        negative_pct: stats.as_ref().map_or(0.0, |s| s.negative_pct),
        neutral_pct: stats.as_ref().map_or(0.0, |s| s.neutral_pct),
        sentiment_divergence: stats.as_ref().map(|s| s.divergence),
        top_clusters: rank_clusters(&metrics, None),
        top_positive_clusters: rank_clusters(&metrics, Some(SentimentLabel::Positive)),
        top_negative_clusters: rank_clusters(&metrics, Some(SentimentLabel::Negative)),
        top_neutral_clusters: rank_clusters(&metrics, Some(SentimentLabel::Neutral)),
        cluster_metrics: metrics,
        updated_at: Utc::now(),
    }
}

pub struct SurveyAggregator {
    store: Arc<dyn Store>,
}

impl SurveyAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        SurveyAggregator { store }
    }

    /// Rebuilds the summary from scratch and replaces the stored one.
    pub fn recompute(&self, survey_id: SurveyId) -> Result<SurveyAnalysisSummary> {
        let start = Instant::now();
        let survey = self.store.survey(survey_id)?;
        let responses = self.store.responses_for_survey(survey.id)?;
        let answers = self.store.answers_for_survey(survey.id)?;
        let words = self.store.words_for_survey(survey.id)?;
        let clusters = self.store.clusters()?;

        let summary = compute_summary(&SurveyData {
            survey_id: survey.id,
            responses: &responses,
            answers: &answers,
            words: &words,
            clusters: &clusters,
        });
        self.store.save_summary(summary.clone())?;

        info!(
            "Recomputed summary for survey {} in {:.2}s: \
             responses={} words={} clusters={} basis={:?}",
            survey_id,
            start.elapsed().as_secs_f32(),
            summary.response_count,
            words.len(),
            summary.cluster_metrics.len(),
            summary.satisfaction_basis
        );
        Ok(summary)
    }

    /// Stored summary, computed on first request.
    pub fn summary(&self, survey_id: SurveyId) -> Result<SurveyAnalysisSummary> {
        match self.store.summary(survey_id)? {
            Some(summary) => Ok(summary),
            None => self.recompute(survey_id),
        }
    }
}
