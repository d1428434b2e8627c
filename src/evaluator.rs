//! LLM-as-judge scoring of provider responses.
//!
//! A [`Judge`] turns one candidate response into [`EvaluationScores`]. The
//! shipped implementation, [`LlmJudge`], asks a chat model for a JSON object
//! and validates it before anything is persisted.

#[path = "evaluator/error.rs"]
mod error;

#[path = "evaluator/judge.rs"]
mod judge;

#[path = "evaluator/prompt.rs"]
mod prompt;

#[path = "evaluator/scores.rs"]
mod scores;

pub use error::EvaluationError;
pub use judge::{Candidate, Judge, LlmJudge, DEFAULT_JUDGE_MODEL};
pub use prompt::judge_instructions;
pub use scores::{parse_scores, EvaluationScores};
