use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::backends::{build_http_client, ensure_success_response, normalize_base_url};
use crate::error::LLMError;

use super::index::{DocumentMatch, VectorIndex, VectorRecord};

/// Client for a Pinecone serverless index data plane.
pub struct PineconeIndex {
    api_key: String,
    host: Url,
    namespace: Option<String>,
    client: Client,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize, Debug)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

#[derive(Serialize, Debug)]
struct UpsertRequest<'a> {
    vectors: [&'a VectorRecord; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

impl PineconeIndex {
    /// `host` is the index host shown in the Pinecone console, with or without scheme.
    pub fn new(
        api_key: impl Into<String>,
        host: &str,
        namespace: Option<String>,
        timeout_seconds: Option<u64>,
    ) -> Result<Self, LLMError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LLMError::AuthError("Missing Pinecone API key".to_string()));
        }
        let host = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        Ok(Self {
            api_key,
            host: normalize_base_url(&host)?,
            namespace,
            client: build_http_client(timeout_seconds)?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, LLMError> {
        self.host
            .join(path)
            .map_err(|e| LLMError::HttpError(e.to_string()))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<DocumentMatch>, LLMError> {
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };
        let response = self
            .client
            .post(self.endpoint("query")?)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success_response(response, "Pinecone query").await?;
        let parsed: QueryResponse = response.json().await?;

        let mut matches: Vec<DocumentMatch> = parsed
            .matches
            .into_iter()
            .map(|m| DocumentMatch {
                text: match m.metadata.get("text") {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                },
                id: m.id,
                score: m.score,
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(matches)
    }

    async fn upsert(&self, record: VectorRecord) -> Result<(), LLMError> {
        let body = UpsertRequest {
            vectors: [&record],
            namespace: self.namespace.as_deref(),
        };
        let response = self
            .client
            .post(self.endpoint("vectors/upsert")?)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        ensure_success_response(response, "Pinecone upsert").await?;
        log::debug!("Upserted vector {} into Pinecone", record.id);
        Ok(())
    }
}
