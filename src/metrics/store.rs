use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use super::record::{MetricsRecord, NewMetricsRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Append-only storage for evaluation records.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Persists a record, assigning it the next id.
    async fn create(&self, entry: NewMetricsRecord) -> Result<MetricsRecord, StoreError>;

    /// Records owned by `owner`, newest first, optionally limited to one model.
    async fn list(&self, owner: &str, model: Option<&str>) -> Result<Vec<MetricsRecord>, StoreError>;

    /// A single record, only if `owner` owns it.
    async fn get(&self, owner: &str, id: u64) -> Result<Option<MetricsRecord>, StoreError>;
}

/// Shared bookkeeping of the in-process and file-backed stores.
#[derive(Debug, Default)]
pub(super) struct Records {
    pub(super) items: Vec<MetricsRecord>,
    pub(super) last_id: u64,
}

impl Records {
    pub(super) fn next(&mut self, entry: NewMetricsRecord) -> MetricsRecord {
        self.last_id += 1;
        MetricsRecord::assign(self.last_id, entry)
    }

    pub(super) fn push(&mut self, record: MetricsRecord) {
        self.last_id = self.last_id.max(record.id);
        self.items.push(record);
    }

    pub(super) fn list(&self, owner: &str, model: Option<&str>) -> Vec<MetricsRecord> {
        let mut out: Vec<MetricsRecord> = self
            .items
            .iter()
            .filter(|r| r.matches(owner, model))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.id.cmp(&a.id));
        out
    }

    pub(super) fn get(&self, owner: &str, id: u64) -> Option<MetricsRecord> {
        self.items
            .iter()
            .find(|r| r.id == id && r.entry.user_id == owner)
            .cloned()
    }
}

/// Volatile store, used by tests and when no metrics file is configured.
#[derive(Debug, Default)]
pub struct InMemoryMetricsStore {
    records: Mutex<Records>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn create(&self, entry: NewMetricsRecord) -> Result<MetricsRecord, StoreError> {
        let mut records = self.records.lock().await;
        let record = records.next(entry);
        records.push(record.clone());
        Ok(record)
    }

    async fn list(&self, owner: &str, model: Option<&str>) -> Result<Vec<MetricsRecord>, StoreError> {
        Ok(self.records.lock().await.list(owner, model))
    }

    async fn get(&self, owner: &str, id: u64) -> Result<Option<MetricsRecord>, StoreError> {
        Ok(self.records.lock().await.get(owner, id))
    }
}
