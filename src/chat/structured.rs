/// Output constraint requested from a non-streaming chat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free text
    #[default]
    Text,
    /// Any syntactically valid JSON object
    JsonObject,
}
