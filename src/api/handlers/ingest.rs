use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::Json;

use super::helpers::{bad_request, identity, internal_error, validate_auth, ApiResult};
use crate::api::types::{ApiEnvelope, IngestResult};
use crate::api::ServerState;
use crate::error::LLMError;
use crate::retrieval::DocumentMetadata;

/// Multipart field carrying the uploaded document.
const FILE_FIELD: &str = "file";

/// Extracts the text of an uploaded document and adds it to the vector index.
pub async fn handle_ingest(
    State(state): State<ServerState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiEnvelope<IngestResult>>> {
    validate_auth(&state, &headers)?;
    identity(&headers)?;

    let augmenter = state
        .pipeline
        .augmenter()
        .ok_or_else(|| bad_request("Document retrieval is not configured"))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| bad_request(e.body_text()))?;
        upload = Some(Upload {
            filename,
            content_type,
            data: data.to_vec(),
        });
        break;
    }
    let upload = upload
        .filter(|u| !u.data.is_empty())
        .ok_or_else(|| bad_request("No file provided"))?;

    let kind = upload.kind().ok_or_else(|| bad_request("Unsupported file type"))?;
    let text = extract_text(kind, upload.data).await?;

    let id = augmenter
        .ingest(
            &text,
            DocumentMetadata {
                kind: kind.as_str().to_string(),
                filename: upload.filename,
            },
        )
        .await
        .map_err(|e| match e {
            LLMError::InvalidRequest(msg) => bad_request(msg),
            other => internal_error(format!("Error processing document: {other}")),
        })?;

    Ok(Json(ApiEnvelope::new(
        "PDF processed successfully",
        IngestResult { text, id },
    )))
}

struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "text",
        }
    }
}

impl Upload {
    fn kind(&self) -> Option<DocumentKind> {
        let content_type = self.content_type.as_deref().unwrap_or_default();
        let extension = self
            .filename
            .as_deref()
            .and_then(|f| f.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        if content_type == "application/pdf" || extension.as_deref() == Some("pdf") {
            Some(DocumentKind::Pdf)
        } else if content_type.starts_with("text/")
            || matches!(extension.as_deref(), Some("txt" | "md"))
        {
            Some(DocumentKind::Text)
        } else {
            None
        }
    }
}

async fn extract_text(kind: DocumentKind, data: Vec<u8>) -> ApiResult<String> {
    match kind {
        DocumentKind::Text => {
            String::from_utf8(data).map_err(|_| bad_request("Text file is not valid UTF-8"))
        }
        DocumentKind::Pdf => {
            // parsing is CPU bound and may panic on malformed input
            tokio::task::spawn_blocking(move || extract_pdf(&data))
                .await
                .map_err(|e| {
                    log::warn!("PDF extraction aborted: {e}");
                    bad_request("Could not read PDF")
                })?
        }
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(data: &[u8]) -> ApiResult<String> {
    pdf_extract::extract_text_from_mem(data).map_err(|e| {
        log::warn!("PDF extraction failed: {e}");
        bad_request(format!("Could not read PDF: {e}"))
    })
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_data: &[u8]) -> ApiResult<String> {
    Err(bad_request("PDF support is not enabled"))
}
