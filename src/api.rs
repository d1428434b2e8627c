//! HTTP surface of the evaluation pipeline.

#[path = "api/handlers.rs"]
mod handlers;

/// Request and response bodies
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::pipeline::Pipeline;

pub use handlers::{ApiError, ApiResult, USER_ID_HEADER};

/// Largest accepted document upload.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// State shared by every handler.
#[derive(Clone)]
pub struct ServerState {
    pub pipeline: Arc<Pipeline>,
    pub auth_key: Option<SecretString>,
    pub channel_capacity: usize,
}

/// Builder for the evaluation server.
pub struct Server {
    state: ServerState,
    cors_origins: Vec<String>,
}

impl Server {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            state: ServerState {
                pipeline: Arc::new(pipeline),
                auth_key: None,
                channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            },
            cors_origins: Vec::new(),
        }
    }

    /// Requires `Authorization: Bearer <key>` on every API route.
    pub fn with_auth_key(mut self, key: Option<SecretString>) -> Self {
        self.state.auth_key = key;
        self
    }

    /// Restricts CORS to these origins. An empty list allows any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.state.channel_capacity = capacity.max(1);
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/models/search", post(handlers::handle_evaluate))
            .route("/api/models/metrics", get(handlers::handle_list_metrics))
            .route("/api/models/metrics/:id", get(handlers::handle_get_metrics))
            .route(
                "/api/file",
                post(handlers::handle_ingest).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
            )
            .route("/health", get(handlers::handle_health))
            .layer(self.cors())
            .with_state(self.state.clone())
    }

    fn cors(&self) -> CorsLayer {
        if self.cors_origins.is_empty() {
            return CorsLayer::permissive();
        }
        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!("Ignoring invalid CORS origin {origin:?}");
                    None
                }
            })
            .collect();
        CorsLayer::permissive().allow_origin(AllowOrigin::list(origins))
    }

    /// Serves on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            log::info!("Listening on {addr}");
        }
        axum::serve(listener, self.router()).await
    }

    pub async fn run(self, addr: &str) -> std::io::Result<()> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }
}
