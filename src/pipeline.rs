//! End-to-end evaluation of one request.
//!
//! `augment → fan out → judge each response → record → final payload`.

#[path = "pipeline/error.rs"]
mod error;

#[path = "pipeline/request.rs"]
mod request;

#[path = "pipeline/runner.rs"]
mod runner;

pub use error::PipelineError;
pub use request::{EvaluationRequest, ModelSelector};
pub use runner::{Dispatch, Pipeline};
