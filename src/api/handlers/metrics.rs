use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use super::helpers::{identity, internal_error, not_found, validate_auth, ApiResult};
use crate::api::types::{ApiEnvelope, MetricsQuery};
use crate::api::ServerState;
use crate::metrics::MetricsRecord;

pub async fn handle_list_metrics(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<ApiEnvelope<Vec<MetricsRecord>>>> {
    validate_auth(&state, &headers)?;
    let owner = identity(&headers)?;
    let model = query.model.as_deref().filter(|m| !m.is_empty());

    let records = state
        .pipeline
        .metrics()
        .store()
        .list(&owner, model)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    Ok(Json(ApiEnvelope::new("Metrics retrieved successfully", records)))
}

pub async fn handle_get_metrics(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> ApiResult<Json<ApiEnvelope<MetricsRecord>>> {
    validate_auth(&state, &headers)?;
    let owner = identity(&headers)?;

    let record = state
        .pipeline
        .metrics()
        .store()
        .get(&owner, id)
        .await
        .map_err(|e| internal_error(e.to_string()))?
        .ok_or_else(|| not_found(format!("Metrics {id} not found")))?;

    Ok(Json(ApiEnvelope::new("Metrics retrieved successfully", record)))
}
