use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluator::EvaluationScores;

pub const MODEL_TYPE: &str = "chat";
pub const MODEL_VERSION: &str = "1.0";
pub const MODEL_CONFIG: &str = "default";

/// Whether the prompt was augmented with retrieved documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Prompt,
    Document,
}

impl TestType {
    pub fn from_document_flag(document: bool) -> Self {
        if document {
            Self::Document
        } else {
            Self::Prompt
        }
    }
}

/// Record contents before the store assigns an id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMetricsRecord {
    pub user_id: String,
    pub model_name: String,
    pub model_provider: String,
    pub model_type: String,
    pub model_version: String,
    pub model_config: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub expected_output: String,
    pub response: String,
    #[serde(flatten)]
    pub scores: EvaluationScores,
    pub test_type: TestType,
}

/// A persisted evaluation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    pub id: u64,
    #[serde(flatten)]
    pub entry: NewMetricsRecord,
    pub created_at: DateTime<Utc>,
}

impl MetricsRecord {
    pub(crate) fn assign(id: u64, entry: NewMetricsRecord) -> Self {
        Self {
            id,
            entry,
            created_at: Utc::now(),
        }
    }

    pub fn matches(&self, owner: &str, model: Option<&str>) -> bool {
        self.entry.user_id == owner && model.map_or(true, |m| self.entry.model_name == m)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_flat_camel_case() {
        let record = MetricsRecord::assign(7, fixtures::entry("u1", "gpt-3.5-turbo", "2+2?"));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["modelName"], "gpt-3.5-turbo");
        assert_eq!(json["modelType"], "chat");
        assert_eq!(json["accuracyScore"], 1.0);
        assert_eq!(json["hallucinationFeedback"], "None");
        assert_eq!(json["testType"], "prompt");
        assert!(json["createdAt"].is_string());

        let back: MetricsRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
