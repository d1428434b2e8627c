#[path = "handlers/evaluate.rs"]
mod evaluate;

#[path = "handlers/health.rs"]
mod health;

#[path = "handlers/helpers.rs"]
mod helpers;

#[path = "handlers/ingest.rs"]
mod ingest;

#[path = "handlers/metrics.rs"]
mod metrics;

pub use evaluate::handle_evaluate;
pub use health::handle_health;
pub use helpers::{ApiError, ApiResult, USER_ID_HEADER};
pub use ingest::handle_ingest;
pub use metrics::{handle_get_metrics, handle_list_metrics};
