use std::sync::Arc;

use crate::evaluator::EvaluationScores;
use crate::registry::ProviderRegistry;

use super::record::{NewMetricsRecord, TestType, MODEL_CONFIG, MODEL_TYPE, MODEL_VERSION};
use super::store::{MetricsStore, StoreError};

/// Request context attached to a scored response.
#[derive(Debug, Clone, Copy)]
pub struct RecordMetadata<'a> {
    pub owner: &'a str,
    pub provider_id: &'a str,
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub expected_output: &'a str,
    pub response: &'a str,
    pub test_type: TestType,
}

/// Turns judge verdicts into stored records.
#[derive(Clone)]
pub struct MetricsSink {
    store: Arc<dyn MetricsStore>,
    registry: Arc<ProviderRegistry>,
}

impl MetricsSink {
    pub fn new(store: Arc<dyn MetricsStore>, registry: Arc<ProviderRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &Arc<dyn MetricsStore> {
        &self.store
    }

    /// Appends one record and returns its id.
    pub async fn record(
        &self,
        metadata: RecordMetadata<'_>,
        scores: EvaluationScores,
    ) -> Result<u64, StoreError> {
        let entry = NewMetricsRecord {
            user_id: metadata.owner.to_string(),
            model_name: metadata.provider_id.to_string(),
            model_provider: self.registry.provider_name(metadata.provider_id).to_string(),
            model_type: MODEL_TYPE.to_string(),
            model_version: MODEL_VERSION.to_string(),
            model_config: MODEL_CONFIG.to_string(),
            system_prompt: metadata.system_prompt.to_string(),
            user_prompt: metadata.user_prompt.to_string(),
            expected_output: metadata.expected_output.to_string(),
            response: metadata.response.to_string(),
            scores,
            test_type: metadata.test_type,
        };
        let record = self.store.create(entry).await?;
        log::debug!("Stored metrics record {} for {}", record.id, metadata.provider_id);
        Ok(record.id)
    }
}
