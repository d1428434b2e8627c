//! Multi-provider LLM evaluation pipeline.
//!
//! A prompt / expected-output pair is dispatched to one or every configured
//! chat backend, the streamed output of each backend is multiplexed over a
//! single byte stream, and every finished response is scored by an
//! LLM-as-judge before the scores are persisted.
//!
//! The main entry point is [`pipeline::Pipeline`], which wires together:
//!
//! - [`registry::ProviderRegistry`]: the lookup table of streaming adapters
//! - [`retrieval::ContextAugmenter`]: optional retrieval-augmented prompting
//! - [`fanout::FanOut`]: concurrent dispatch under a global deadline
//! - [`evaluator::Judge`]: structured scoring of each response
//! - [`metrics::MetricsSink`]: persistence of the resulting records
//! - [`transport`]: framing of the interleaved output for the caller

/// Concrete chat and embedding backends
pub mod backends;

/// Chat message types and the streaming provider trait
pub mod chat;

/// Server configuration loaded from TOML and the environment
pub mod config;

/// Embedding provider trait
pub mod embedding;

/// Error types
pub mod error;

/// LLM-as-judge scoring of provider responses
pub mod evaluator;

/// Concurrent dispatch of one prompt to many providers
pub mod fanout;

/// Evaluation records and their stores
pub mod metrics;

/// End-to-end request pipeline
pub mod pipeline;

/// Lookup table of configured providers
pub mod registry;

/// Retry wrapper for chat providers
pub mod resilient;

/// Vector retrieval and prompt augmentation
pub mod retrieval;

/// Multiplexed byte stream framing
pub mod transport;

#[cfg(feature = "api")]
/// HTTP API built on axum
pub mod api;

pub use error::LLMError;
pub use pipeline::{EvaluationRequest, ModelSelector, Pipeline};
pub use registry::{ProviderId, ProviderRegistry};

#[cfg(test)]
mod test_support;
