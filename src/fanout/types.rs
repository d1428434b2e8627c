use serde::{Deserialize, Serialize};

use crate::registry::ProviderId;

/// Text evaluated in place of a response that failed or came back empty.
pub const FAILED_RESPONSE_TEXT: &str = "Model failed to generate a response.";

/// How one adapter's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Completed,
    Failed,
    TimedOut,
}

/// A piece of streamed text, tagged with its origin in all-models mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// `None` when a single provider is streaming.
    pub provider: Option<ProviderId>,
    pub text: String,
}

/// Outcome of streaming one provider's response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub provider_id: ProviderId,
    /// Everything streamed to the caller, in emission order.
    pub text: String,
    pub status: ProviderStatus,
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

impl ProviderResponse {
    /// Text handed to the judge: the streamed text, or the failure sentinel
    /// when the provider errored or produced nothing.
    pub fn evaluation_text(&self) -> &str {
        if self.status == ProviderStatus::Completed && !self.text.is_empty() {
            &self.text
        } else {
            FAILED_RESPONSE_TEXT
        }
    }

    /// Whether this response goes on to the judge. Providers cut off by the
    /// deadline never completed and are not evaluated.
    pub fn is_evaluable(&self) -> bool {
        self.status != ProviderStatus::TimedOut
    }
}

/// Everything a fan-out run produced, in dispatch order.
#[derive(Debug, Clone)]
pub struct FanOutResult {
    pub responses: Vec<ProviderResponse>,
    pub timed_out: bool,
}
