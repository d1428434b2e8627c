use thiserror::Error;

use crate::error::LLMError;

/// Failures that abort a whole request.
///
/// Failures of individual providers or of their evaluation do not appear
/// here; they are reported per provider in the final payload.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("No providers are configured")]
    NoProviders,
    #[error("Document context requested but retrieval is not configured")]
    RetrievalUnavailable,
    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] LLMError),
}

impl PipelineError {
    /// Whether the caller sent something unusable, as opposed to a server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::UnknownModel(_) | PipelineError::RetrievalUnavailable
        )
    }
}
