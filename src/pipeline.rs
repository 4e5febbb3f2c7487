use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::aggregate::SurveyAggregator;
use crate::classifier::{ClassifierConfig, TextClassifier, classifier_from_config};
use crate::clusters::{ClusterAssigner, ClusterMapping};
use crate::error::{ClassifierError, Result};
use crate::export::{ExportFormat, export_survey};
use crate::language::{LanguageRegistry, ResourceOptions};
use crate::model::{AnswerId, SurveyAnalysisSummary, SurveyId};
use crate::processor::{BatchReport, ProcessOutcome, ResponseProcessor};
use crate::sentiment::{SentimentStrategy, scorer_for};
use crate::store::Store;

/// The inbound operations of the analysis pipeline, wired over one store.
pub struct Pipeline {
    store: Arc<dyn Store>,
    registry: Arc<LanguageRegistry>,
    assigner: ClusterAssigner,
    processor: ResponseProcessor,
    aggregator: SurveyAggregator,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<LanguageRegistry>,
        classifier: Arc<dyn TextClassifier>,
        strategy: SentimentStrategy,
    ) -> Self {
        let scorer = scorer_for(strategy, Arc::clone(&registry), Arc::clone(&classifier));
        let processor = ResponseProcessor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            scorer,
            ClusterAssigner::new(Arc::clone(&classifier)),
        );
        Pipeline {
            aggregator: SurveyAggregator::new(Arc::clone(&store)),
            assigner: ClusterAssigner::new(classifier),
            processor,
            registry,
            store,
        }
    }

    /// Builds the classifier from its config; no endpoint means a disabled classifier.
    pub fn from_config(
        store: Arc<dyn Store>,
        resources: ResourceOptions,
        classifier: &ClassifierConfig,
        strategy: SentimentStrategy,
    ) -> Result<Self, ClassifierError> {
        let classifier: Arc<dyn TextClassifier> = Arc::from(classifier_from_config(classifier)?);
        let registry = Arc::new(LanguageRegistry::new(resources));
        Ok(Self::new(store, registry, classifier, strategy))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<LanguageRegistry> {
        &self.registry
    }

    pub fn process_answer(&self, answer_id: AnswerId) -> Result<ProcessOutcome> {
        self.processor.process_answer(answer_id)
    }

    pub fn process_survey(&self, survey_id: SurveyId) -> Result<BatchReport> {
        self.processor.process_survey(survey_id)
    }

    pub fn summary(&self, survey_id: SurveyId) -> Result<SurveyAnalysisSummary> {
        self.aggregator.summary(survey_id)
    }

    pub fn recompute(&self, survey_id: SurveyId) -> Result<SurveyAnalysisSummary> {
        self.aggregator.recompute(survey_id)
    }

    /// Word list to cluster names, against the survey's candidates or the global ones.
    pub fn classify(
        &self,
        survey_id: Option<SurveyId>,
        text: &str,
        words: &[String],
        language: &str,
    ) -> Result<ClusterMapping> {
        self.assigner
            .classify(self.store.as_ref(), survey_id, text, words, language)
    }

    /// Recomputes the summary, then writes the export tables.
    pub fn export(
        &self,
        survey_id: SurveyId,
        format: ExportFormat,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let summary = self.aggregator.recompute(survey_id)?;
        export_survey(self.store.as_ref(), &summary, format, out_dir)
    }
}
