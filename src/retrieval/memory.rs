use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::LLMError;

use super::index::{DocumentMatch, VectorIndex, VectorRecord};

/// Process-local index using cosine similarity.
///
/// Equal scores keep insertion order, so repeated queries against an
/// unchanged index return identical matches.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

fn poisoned() -> LLMError {
    LLMError::IndexError("in-memory vector index lock poisoned".to_string())
}

/// All stored vectors share the dimension of the first one.
fn check_dimension(records: &[VectorRecord], len: usize) -> Result<(), LLMError> {
    match records.first() {
        Some(first) if first.values.len() != len => Err(LLMError::IndexError(format!(
            "vector dimension mismatch: index holds {}, got {len}",
            first.values.len()
        ))),
        _ => Ok(()),
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<DocumentMatch>, LLMError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        check_dimension(&records, vector.len())?;
        let mut scored: Vec<DocumentMatch> = records
            .iter()
            .map(|record| DocumentMatch {
                id: record.id.clone(),
                score: cosine(vector, &record.values),
                text: record.metadata.get("text").cloned().unwrap_or_default(),
            })
            .collect();
        // stable sort: ties stay in insertion order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn upsert(&self, record: VectorRecord) -> Result<(), LLMError> {
        if record.values.is_empty() {
            return Err(LLMError::IndexError(format!("vector {} has no values", record.id)));
        }
        let mut records = self.records.write().map_err(|_| poisoned())?;
        check_dimension(&records, record.values.len())?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        Ok(())
    }
}
