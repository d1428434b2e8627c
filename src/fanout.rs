#[path = "fanout/types.rs"]
mod types;

#[path = "fanout/orchestrator.rs"]
mod orchestrator;

pub use orchestrator::{FanOut, DEFAULT_DEADLINE};
pub use types::{FanOutResult, Fragment, ProviderResponse, ProviderStatus, FAILED_RESPONSE_TEXT};
