//! Chat and embedding backends.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::error::LLMError;

pub mod openai_compatible;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "groq")]
pub mod groq;

#[cfg(feature = "google")]
pub mod google;

/// Builds the HTTP client shared by one backend instance.
pub(crate) fn build_http_client(timeout_seconds: Option<u64>) -> Result<Client, LLMError> {
    let mut builder = Client::builder();
    if let Some(sec) = timeout_seconds {
        builder = builder.timeout(Duration::from_secs(sec));
    }
    builder
        .build()
        .map_err(|e| LLMError::HttpError(format!("Failed to build HTTP client: {e}")))
}

/// Parses a base URL, making sure relative joins append to its path.
pub(crate) fn normalize_base_url(raw: &str) -> Result<Url, LLMError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash)
        .map_err(|e| LLMError::InvalidRequest(format!("Invalid base URL '{raw}': {e}")))
}

/// Turns a non-2xx response into an error carrying the body.
///
/// Rejected credentials map to [`LLMError::AuthError`] and malformed requests
/// to [`LLMError::InvalidRequest`], so retry wrappers can tell them apart from
/// transient upstream failures.
pub(crate) async fn ensure_success_response(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, LLMError> {
    log::debug!("{context} HTTP status: {}", response.status());
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await?;
    Err(status_error(status, context, error_text))
}

fn status_error(status: StatusCode, context: &str, body: String) -> LLMError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LLMError::AuthError(format!("{context} returned {status}: {body}"))
        }
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            LLMError::InvalidRequest(format!("{context} returned {status}: {body}"))
        }
        _ => LLMError::ResponseFormatError {
            message: format!("{context} returned error status: {status}"),
            raw_response: body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = normalize_base_url("https://api.groq.com/openai/v1").unwrap();
        assert_eq!(
            url.join("chat/completions").unwrap().as_str(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn client_errors_are_not_format_errors() {
        let auth = status_error(StatusCode::UNAUTHORIZED, "OpenAI", "bad key".to_string());
        assert!(matches!(auth, LLMError::AuthError(msg) if msg.contains("bad key")));

        let invalid = status_error(StatusCode::UNPROCESSABLE_ENTITY, "OpenAI", "{}".to_string());
        assert!(matches!(invalid, LLMError::InvalidRequest(_)));

        let busy = status_error(StatusCode::TOO_MANY_REQUESTS, "OpenAI", "slow down".to_string());
        assert!(matches!(
            busy,
            LLMError::ResponseFormatError { raw_response, .. } if raw_response == "slow down"
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            normalize_base_url("not a url"),
            Err(LLMError::InvalidRequest(_))
        ));
    }
}
