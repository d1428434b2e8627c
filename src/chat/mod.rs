mod message;
mod sse;
mod structured;
mod traits;

pub use message::{ChatMessage, ChatMessageBuilder, ChatRole};
pub use structured::ResponseFormat;
pub use traits::{ChatProvider, ChatResponse, TextStream};

pub(crate) use sse::{create_sse_stream, event_data};
