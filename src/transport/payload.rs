use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::evaluator::EvaluationScores;
use crate::fanout::ProviderStatus;
use crate::registry::ProviderId;

/// Result value sent when document context was requested but nothing matched.
pub const NO_DOCUMENT: &str = "no document found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    Single,
    All,
}

/// Per-provider line of the final payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutcome {
    pub provider_id: ProviderId,
    pub provider_name: String,
    pub status: ProviderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Text that was judged; the failure sentinel for failed providers.
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalPayload {
    pub mode: DispatchMode,
    pub timed_out: bool,
    pub results: Vec<ProviderOutcome>,
}

impl FinalPayload {
    pub fn outcome(&self, provider: &str) -> Option<&ProviderOutcome> {
        self.results.iter().find(|o| o.provider_id.as_str() == provider)
    }
}

/// What a finished pipeline run reports.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalResult {
    Completed(FinalPayload),
    /// Retrieval found nothing; no provider was called.
    NoDocument,
}

impl Serialize for FinalResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FinalResult::Completed(payload) => payload.serialize(serializer),
            FinalResult::NoDocument => serializer.serialize_str(NO_DOCUMENT),
        }
    }
}

impl<'de> Deserialize<'de> for FinalResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Payload(FinalPayload),
            Text(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Payload(payload) => Ok(FinalResult::Completed(payload)),
            Repr::Text(text) if text == NO_DOCUMENT => Ok(FinalResult::NoDocument),
            Repr::Text(other) => Err(serde::de::Error::custom(format!(
                "unexpected result string: {other}"
            ))),
        }
    }
}

/// JSON object following the final marker. `result` is `null` when the
/// pipeline failed, in which case `error` says why.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FinalEnvelope {
    pub result: Option<FinalResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FinalEnvelope {
    pub fn completed(result: FinalResult) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
        }
    }
}
