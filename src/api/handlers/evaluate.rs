use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;

use super::helpers::{bad_request, identity, internal_error, validate_auth, ApiResult};
use crate::api::ServerState;
use crate::pipeline::EvaluationRequest;
use crate::transport::{encode_final, encode_fragment, FinalEnvelope, FINAL_MARKER, RECORD_SEPARATOR};

/// Streams model output followed by the final results frame.
///
/// The pipeline runs on its own task: a client that goes away stops
/// receiving bytes, but evaluation and persistence still complete.
pub async fn handle_evaluate(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Result<Json<EvaluationRequest>, JsonRejection>,
) -> ApiResult<Response> {
    validate_auth(&state, &headers)?;
    let owner = identity(&headers)?;
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;

    let dispatch = state.pipeline.dispatch(&request).map_err(|e| {
        if e.is_client_error() {
            bad_request(e.to_string())
        } else {
            internal_error(e.to_string())
        }
    })?;
    log::debug!(
        "Evaluating for {owner} on {} provider(s), document={}",
        dispatch.targets.len(),
        request.document
    );

    let (tx, rx) = mpsc::channel(state.channel_capacity);
    let pipeline = state.pipeline.clone();
    let task = tokio::spawn(async move { pipeline.execute(dispatch, &request, &owner, tx).await });

    let live = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|fragment| (encode_fragment(&fragment), rx))
    });
    let terminal = stream::once(async move {
        let envelope = match task.await {
            Ok(Ok(result)) => FinalEnvelope::completed(result),
            Ok(Err(err)) => {
                log::warn!("Evaluation pipeline failed: {err}");
                FinalEnvelope::failed(err.to_string())
            }
            Err(err) => {
                log::warn!("Evaluation task aborted: {err}");
                FinalEnvelope::failed("Evaluation task aborted")
            }
        };
        final_frame(&envelope)
    });
    let body = live
        .chain(terminal)
        .map(Ok::<Bytes, std::convert::Infallible>);

    Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .map_err(|e| internal_error(e.to_string()))
}

fn final_frame(envelope: &FinalEnvelope) -> Bytes {
    encode_final(envelope).unwrap_or_else(|err| {
        log::warn!("Failed to encode final payload: {err}");
        let mut fallback = vec![RECORD_SEPARATOR];
        fallback.extend_from_slice(FINAL_MARKER.as_bytes());
        fallback.extend_from_slice(br#"{"result":null,"error":"Failed to encode results"}"#);
        Bytes::from(fallback)
    })
}
