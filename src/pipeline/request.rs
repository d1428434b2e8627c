use serde::{Deserialize, Serialize};

use crate::registry::{ProviderId, ALL_MODELS};

use super::error::PipelineError;

/// Body of an evaluation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub expected_output: String,
    /// A provider id, or `"all"`.
    pub model: String,
    /// Augment the prompt with retrieved documents.
    #[serde(default)]
    pub document: bool,
}

/// Which providers a request is dispatched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelector {
    Single(ProviderId),
    All,
}

impl ModelSelector {
    pub fn parse(model: &str) -> Result<Self, PipelineError> {
        if model == ALL_MODELS {
            return Ok(Self::All);
        }
        ProviderId::new(model)
            .map(Self::Single)
            .map_err(|_| PipelineError::UnknownModel(model.to_string()))
    }
}

impl EvaluationRequest {
    pub fn selector(&self) -> Result<ModelSelector, PipelineError> {
        ModelSelector::parse(&self.model)
    }
}
