use axum::extract::State;
use axum::Json;

use crate::api::types::HealthResponse;
use crate::api::ServerState;

pub async fn handle_health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        providers: state
            .pipeline
            .registry()
            .ids()
            .map(|id| id.to_string())
            .collect(),
    })
}
