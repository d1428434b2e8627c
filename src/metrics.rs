//! Evaluation records and where they are kept.

#[path = "metrics/json_store.rs"]
mod json_store;

#[path = "metrics/record.rs"]
mod record;

#[path = "metrics/sink.rs"]
mod sink;

#[path = "metrics/store.rs"]
mod store;

pub use json_store::JsonlMetricsStore;
pub use record::{MetricsRecord, NewMetricsRecord, TestType, MODEL_CONFIG, MODEL_TYPE, MODEL_VERSION};
pub use sink::{MetricsSink, RecordMetadata};
pub use store::{InMemoryMetricsStore, MetricsStore, StoreError};
