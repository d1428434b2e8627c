use thiserror::Error;

use crate::error::LLMError;

/// Reasons a judge call produced no usable scores.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The judge model could not be reached or rejected the request
    #[error("Judge request failed: {0}")]
    Provider(#[from] LLMError),
    /// The judge replied without any content
    #[error("No evaluation response")]
    EmptyResponse,
    /// The reply was not the expected JSON object
    #[error("Invalid evaluation JSON: {message}. Raw response: {raw}")]
    InvalidJson { message: String, raw: String },
    /// A score was not a finite number in [0, 1]
    #[error("Score {field} out of range [0, 1]: {value}")]
    ScoreOutOfRange { field: &'static str, value: f64 },
}
