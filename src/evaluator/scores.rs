use serde::{Deserialize, Serialize};

use super::error::EvaluationError;

/// Validated judge verdict for one response.
///
/// Every score is a finite number in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationScores {
    pub relevance_score: f64,
    pub accuracy_score: f64,
    pub clarity_score: f64,
    pub coherence_score: f64,
    pub creativity_score: f64,
    pub alignment_score: f64,
    pub hallucination_score: f64,
    pub evaluation: String,
    pub evaluation_score: f64,
    pub evaluation_feedback: String,
    pub hallucination_feedback: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScores {
    relevance_score: f64,
    accuracy_score: f64,
    clarity_score: f64,
    coherence_score: f64,
    creativity_score: f64,
    alignment_score: f64,
    hallucination_score: f64,
    #[serde(default)]
    evaluation: String,
    #[serde(default)]
    evaluation_score: Option<f64>,
    #[serde(default)]
    evaluation_feedback: String,
    #[serde(default)]
    hallucination_feedback: Option<String>,
}

impl EvaluationScores {
    /// The seven bounded sub-scores, keyed by their wire names.
    pub fn sub_scores(&self) -> [(&'static str, f64); 7] {
        [
            ("relevanceScore", self.relevance_score),
            ("accuracyScore", self.accuracy_score),
            ("clarityScore", self.clarity_score),
            ("coherenceScore", self.coherence_score),
            ("creativityScore", self.creativity_score),
            ("alignmentScore", self.alignment_score),
            ("hallucinationScore", self.hallucination_score),
        ]
    }

    fn validate(&self) -> Result<(), EvaluationError> {
        self.sub_scores()
            .into_iter()
            .chain(std::iter::once(("evaluationScore", self.evaluation_score)))
            .try_for_each(|(field, value)| check_bounds(field, value))
    }
}

fn check_bounds(field: &'static str, value: f64) -> Result<(), EvaluationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EvaluationError::ScoreOutOfRange { field, value })
    }
}

/// Strips an optional Markdown code fence around a JSON reply.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses and validates a judge reply.
///
/// When `evaluationScore` is absent it is derived as the mean of the six
/// quality scores; the hallucination score is not part of that mean.
pub fn parse_scores(raw: &str) -> Result<EvaluationScores, EvaluationError> {
    let body = strip_fence(raw);
    if body.is_empty() {
        return Err(EvaluationError::EmptyResponse);
    }

    let parsed: RawScores =
        serde_json::from_str(body).map_err(|e| EvaluationError::InvalidJson {
            message: e.to_string(),
            raw: raw.to_string(),
        })?;

    let quality = [
        parsed.relevance_score,
        parsed.accuracy_score,
        parsed.clarity_score,
        parsed.coherence_score,
        parsed.creativity_score,
        parsed.alignment_score,
    ];
    let evaluation_score = parsed
        .evaluation_score
        .unwrap_or_else(|| quality.iter().sum::<f64>() / quality.len() as f64);

    let scores = EvaluationScores {
        relevance_score: parsed.relevance_score,
        accuracy_score: parsed.accuracy_score,
        clarity_score: parsed.clarity_score,
        coherence_score: parsed.coherence_score,
        creativity_score: parsed.creativity_score,
        alignment_score: parsed.alignment_score,
        hallucination_score: parsed.hallucination_score,
        evaluation: parsed.evaluation,
        evaluation_score,
        evaluation_feedback: parsed.evaluation_feedback,
        hallucination_feedback: parsed
            .hallucination_feedback
            .unwrap_or_else(|| "None".to_string()),
    };
    scores.validate()?;
    Ok(scores)
}
