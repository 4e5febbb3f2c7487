use thiserror::Error;

use crate::model::{AnswerId, ClusterId, ResponseId, SurveyId};

/// Errors surfaced by the pipeline to its callers.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("survey {0} not found")]
    SurveyNotFound(SurveyId),

    #[error("response {0} not found")]
    ResponseNotFound(ResponseId),

    #[error("answer {0} not found")]
    AnswerNotFound(AnswerId),

    #[error("cluster {0} not found")]
    ClusterNotFound(ClusterId),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    /// True for the entity-not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PipelineError::SurveyNotFound(_)
                | PipelineError::ResponseNotFound(_)
                | PipelineError::AnswerNotFound(_)
                | PipelineError::ClusterNotFound(_)
        )
    }
}

/// Errors from the external text-classification service.
///
/// These never cross the pipeline boundary: call sites turn them into empty results.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("text classifier is not configured")]
    NotConfigured,

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classifier returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("classifier response had no message content")]
    EmptyResponse,
}

impl ClassifierError {
    /// Transport failures and server-side statuses are worth one more attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClassifierError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClassifierError::Status { status, .. } => *status == 429 || *status >= 500,
            ClassifierError::NotConfigured | ClassifierError::EmptyResponse => false,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
