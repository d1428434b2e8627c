use serde::{Deserialize, Serialize};

/// Success and error body shared by the JSON endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub detail: String,
    pub result: T,
}

impl<T> ApiEnvelope<T> {
    pub fn new(detail: impl Into<String>, result: T) -> Self {
        Self {
            detail: detail.into(),
            result,
        }
    }
}

/// Body of authentication failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResult {
    pub text: String,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub providers: Vec<String>,
}
