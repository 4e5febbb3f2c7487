//! Persistence boundary.
//!
//! The pipeline only needs the operations on [`Store`]. [`MemoryStore`] keeps
//! everything behind one `RwLock`, so each write method is a single atomic
//! transaction, and can be loaded from / saved to a JSON snapshot file.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::model::{
    Answer, AnswerId, Cluster, ClusterId, ExtractedWord, Response, ResponseId,
    SentenceSentiment, Survey, SurveyAnalysisSummary, SurveyId, WordId,
};

/// A word ready to be persisted; ids are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWord {
    pub word: String,
    pub source_text: String,
    pub language: String,
    pub sentence_text: String,
    pub sentence_index: Option<usize>,
    pub sentiment: f64,
    pub cluster_name: String,
    pub cluster_id: ClusterId,
}

/// Everything written when an answer becomes processed.
#[derive(Debug, Clone)]
pub struct AnswerCommit {
    pub answer_id: AnswerId,
    pub sentences: Vec<SentenceSentiment>,
    pub words: Vec<NewWord>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { words: usize },
    /// Another worker committed this answer first; nothing was written.
    AlreadyProcessed,
}

pub trait Store: Send + Sync {
    fn survey(&self, id: SurveyId) -> Result<Survey>;
    fn response(&self, id: ResponseId) -> Result<Response>;
    fn responses_for_survey(&self, survey_id: SurveyId) -> Result<Vec<Response>>;
    fn answer(&self, id: AnswerId) -> Result<Answer>;
    fn answers_for_survey(&self, survey_id: SurveyId) -> Result<Vec<Answer>>;
    /// Ids of answers with `processed == false`, in id order.
    fn unprocessed_answers(&self, survey_id: SurveyId) -> Result<Vec<AnswerId>>;
    fn clusters(&self) -> Result<Vec<Cluster>>;
    /// Atomic create-if-absent keyed by name.
    fn get_or_create_cluster(&self, name: &str, owner: &str) -> Result<Cluster>;
    fn words_for_survey(&self, survey_id: SurveyId) -> Result<Vec<ExtractedWord>>;
    fn words_for_answer(&self, answer_id: AnswerId) -> Result<Vec<ExtractedWord>>;
    /// Writes words, sentence sentiments and `processed = true` together, or nothing.
    fn commit_processed_answer(&self, commit: AnswerCommit) -> Result<CommitOutcome>;
    fn summary(&self, survey_id: SurveyId) -> Result<Option<SurveyAnalysisSummary>>;
    /// Replaces the survey's summary as a whole.
    fn save_summary(&self, summary: SurveyAnalysisSummary) -> Result<()>;
}

/// On-disk layout of a [`MemoryStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub surveys: Vec<Survey>,
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub words: Vec<ExtractedWord>,
    #[serde(default)]
    pub summaries: Vec<SurveyAnalysisSummary>,
}

#[derive(Debug, Default)]
struct Tables {
    surveys: BTreeMap<SurveyId, Survey>,
    responses: BTreeMap<ResponseId, Response>,
    answers: BTreeMap<AnswerId, Answer>,
    clusters: BTreeMap<ClusterId, Cluster>,
    cluster_names: HashMap<String, ClusterId>,
    words: Vec<ExtractedWord>,
    /// Highest word id handed out so far.
    last_word_id: WordId,
    summaries: BTreeMap<SurveyId, SurveyAnalysisSummary>,
}

impl Tables {
    fn next_cluster_id(&self) -> ClusterId {
        self.clusters.keys().next_back().map_or(1, |id| id + 1)
    }

    fn response_ids(&self, survey_id: SurveyId) -> BTreeSet<ResponseId> {
        self.responses
            .values()
            .filter(|r| r.survey_id == survey_id)
            .map(|r| r.id)
            .collect()
    }

    fn require_survey(&self, survey_id: SurveyId) -> Result<()> {
        if self.surveys.contains_key(&survey_id) {
            Ok(())
        } else {
            Err(PipelineError::SurveyNotFound(survey_id))
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut tables = Tables::default();
        for survey in snapshot.surveys {
            tables.surveys.insert(survey.id, survey);
        }
        for response in snapshot.responses {
            tables.responses.insert(response.id, response);
        }
        for answer in snapshot.answers {
            tables.answers.insert(answer.id, answer);
        }
        for cluster in snapshot.clusters {
            tables.cluster_names.insert(cluster.name.clone(), cluster.id);
            tables.clusters.insert(cluster.id, cluster);
        }
        tables.last_word_id = snapshot.words.iter().map(|w| w.id).max().unwrap_or(0);
        tables.words = snapshot.words;
        for summary in snapshot.summaries {
            tables.summaries.insert(summary.survey_id, summary);
        }
        MemoryStore {
            tables: RwLock::new(tables),
        }
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let tables = self.read()?;
        Ok(Snapshot {
            surveys: tables.surveys.values().cloned().collect(),
            responses: tables.responses.values().cloned().collect(),
            answers: tables.answers.values().cloned().collect(),
            clusters: tables.clusters.values().cloned().collect(),
            words: tables.words.clone(),
            summaries: tables.summaries.values().cloned().collect(),
        })
    }

    /// Loads a JSON snapshot file.
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        info!(
            "Loaded store {} surveys={} responses={} answers={} clusters={} words={}",
            path.display(),
            snapshot.surveys.len(),
            snapshot.responses.len(),
            snapshot.answers.len(),
            snapshot.clusters.len(),
            snapshot.words.len()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Writes a JSON snapshot next to `path`, then renames it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&snapshot)?)?;
        fs::rename(&tmp, path)?;
        debug!("Saved store to {}", path.display());
        Ok(())
    }

    pub fn insert_survey(&self, survey: Survey) -> Result<()> {
        self.write()?.surveys.insert(survey.id, survey);
        Ok(())
    }

    pub fn insert_response(&self, response: Response) -> Result<()> {
        let mut tables = self.write()?;
        tables.require_survey(response.survey_id)?;
        tables.responses.insert(response.id, response);
        Ok(())
    }

    pub fn insert_answer(&self, answer: Answer) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.responses.contains_key(&answer.response_id) {
            return Err(PipelineError::ResponseNotFound(answer.response_id));
        }
        tables.answers.insert(answer.id, answer);
        Ok(())
    }

    /// Inserts or replaces a cluster definition.
    pub fn insert_cluster(&self, cluster: Cluster) -> Result<()> {
        let mut tables = self.write()?;
        if let Some(old) = tables.clusters.get(&cluster.id) {
            let old_name = old.name.clone();
            let owns_old_name = tables.cluster_names.get(&old_name) == Some(&cluster.id);
            if old_name != cluster.name && owns_old_name {
                tables.cluster_names.remove(&old_name);
            }
        }
        tables.cluster_names.insert(cluster.name.clone(), cluster.id);
        tables.clusters.insert(cluster.id, cluster);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| PipelineError::Store("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| PipelineError::Store("store lock poisoned".to_string()))
    }
}

impl Store for MemoryStore {
    fn survey(&self, id: SurveyId) -> Result<Survey> {
        self.read()?
            .surveys
            .get(&id)
            .cloned()
            .ok_or(PipelineError::SurveyNotFound(id))
    }

    fn response(&self, id: ResponseId) -> Result<Response> {
        self.read()?
            .responses
            .get(&id)
            .cloned()
            .ok_or(PipelineError::ResponseNotFound(id))
    }

    fn responses_for_survey(&self, survey_id: SurveyId) -> Result<Vec<Response>> {
        let tables = self.read()?;
        tables.require_survey(survey_id)?;
        Ok(tables
            .responses
            .values()
            .filter(|r| r.survey_id == survey_id)
            .cloned()
            .collect())
    }

    fn answer(&self, id: AnswerId) -> Result<Answer> {
        self.read()?
            .answers
            .get(&id)
            .cloned()
            .ok_or(PipelineError::AnswerNotFound(id))
    }

    fn answers_for_survey(&self, survey_id: SurveyId) -> Result<Vec<Answer>> {
        let tables = self.read()?;
        tables.require_survey(survey_id)?;
        let responses = tables.response_ids(survey_id);
        Ok(tables
            .answers
            .values()
            .filter(|a| responses.contains(&a.response_id))
            .cloned()
            .collect())
    }

    fn unprocessed_answers(&self, survey_id: SurveyId) -> Result<Vec<AnswerId>> {
        let tables = self.read()?;
        tables.require_survey(survey_id)?;
        let responses = tables.response_ids(survey_id);
        Ok(tables
            .answers
            .values()
            .filter(|a| !a.processed && responses.contains(&a.response_id))
            .map(|a| a.id)
            .collect())
    }

    fn clusters(&self) -> Result<Vec<Cluster>> {
        Ok(self.read()?.clusters.values().cloned().collect())
    }

    fn get_or_create_cluster(&self, name: &str, owner: &str) -> Result<Cluster> {
        let existing = {
            let tables = self.read()?;
            let found = tables
                .cluster_names
                .get(name)
                .and_then(|id| tables.clusters.get(id))
                .cloned();
            found
        };
        if let Some(cluster) = existing {
            return Ok(cluster);
        }

        // re-check under the write lock; another worker may have won the race
        let mut tables = self.write()?;
        if let Some(cluster) = tables
            .cluster_names
            .get(name)
            .and_then(|id| tables.clusters.get(id))
        {
            return Ok(cluster.clone());
        }
        let cluster = Cluster {
            id: tables.next_cluster_id(),
            name: name.to_string(),
            keywords: Vec::new(),
            is_active: true,
            owner: owner.to_string(),
            template_id: None,
            survey_id: None,
            word_count: 0,
            last_processed: None,
        };
        info!("Created cluster '{}' (id {})", cluster.name, cluster.id);
        tables.cluster_names.insert(cluster.name.clone(), cluster.id);
        tables.clusters.insert(cluster.id, cluster.clone());
        Ok(cluster)
    }

    fn words_for_survey(&self, survey_id: SurveyId) -> Result<Vec<ExtractedWord>> {
        let tables = self.read()?;
        tables.require_survey(survey_id)?;
        Ok(tables
            .words
            .iter()
            .filter(|w| w.survey_id == survey_id)
            .cloned()
            .collect())
    }

    fn words_for_answer(&self, answer_id: AnswerId) -> Result<Vec<ExtractedWord>> {
        Ok(self
            .read()?
            .words
            .iter()
            .filter(|w| w.answer_id == answer_id)
            .cloned()
            .collect())
    }

    fn commit_processed_answer(&self, commit: AnswerCommit) -> Result<CommitOutcome> {
        let mut tables = self.write()?;

        // validate everything before the first mutation
        let answer = tables
            .answers
            .get(&commit.answer_id)
            .ok_or(PipelineError::AnswerNotFound(commit.answer_id))?;
        if answer.processed {
            return Ok(CommitOutcome::AlreadyProcessed);
        }
        let response_id = answer.response_id;
        let survey_id = tables
            .responses
            .get(&response_id)
            .map(|r| r.survey_id)
            .ok_or(PipelineError::ResponseNotFound(response_id))?;
        if let Some(missing) = commit
            .words
            .iter()
            .find(|w| !tables.clusters.contains_key(&w.cluster_id))
        {
            return Err(PipelineError::ClusterNotFound(missing.cluster_id));
        }

        let count = commit.words.len();
        for new_word in commit.words {
            if let Some(cluster) = tables.clusters.get_mut(&new_word.cluster_id) {
                cluster.word_count += 1;
                cluster.last_processed = Some(commit.processed_at);
            }
            tables.last_word_id += 1;
            let id = tables.last_word_id;
            tables.words.push(ExtractedWord {
                id,
                answer_id: commit.answer_id,
                response_id,
                survey_id,
                word: new_word.word,
                source_text: new_word.source_text,
                language: new_word.language,
                sentence_text: new_word.sentence_text,
                sentence_index: new_word.sentence_index,
                sentiment: new_word.sentiment,
                cluster_name: new_word.cluster_name,
                cluster_ids: BTreeSet::from([new_word.cluster_id]),
                created_at: commit.processed_at,
            });
        }

        if let Some(answer) = tables.answers.get_mut(&commit.answer_id) {
            answer.sentence_sentiments = commit.sentences;
            answer.processed = true;
        }
        Ok(CommitOutcome::Committed { words: count })
    }

    fn summary(&self, survey_id: SurveyId) -> Result<Option<SurveyAnalysisSummary>> {
        Ok(self.read()?.summaries.get(&survey_id).cloned())
    }

    fn save_summary(&self, summary: SurveyAnalysisSummary) -> Result<()> {
        let mut tables = self.write()?;
        tables.require_survey(summary.survey_id)?;
        tables.summaries.insert(summary.survey_id, summary);
        Ok(())
    }
}
