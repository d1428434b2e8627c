use std::fmt;

/// Role of a participant in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// Instructions that frame the conversation
    System,
    /// The user/human participant in the conversation
    User,
    /// The AI assistant participant in the conversation
    Assistant,
}

impl ChatRole {
    /// Wire name used by OpenAI-compatible APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// The role of who sent this message
    pub role: ChatRole,
    /// The text content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new builder for a system message
    pub fn system() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::System)
    }

    /// Create a new builder for a user message
    pub fn user() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::User)
    }

    /// Create a new builder for an assistant message
    pub fn assistant() -> ChatMessageBuilder {
        ChatMessageBuilder::new(ChatRole::Assistant)
    }

    /// The usual two-message exchange: system instructions then the user prompt.
    pub fn exchange(system: impl Into<String>, user: impl Into<String>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system().content(system).build(),
            ChatMessage::user().content(user).build(),
        ]
    }

    pub fn is_system(&self) -> bool {
        self.role == ChatRole::System
    }
}

/// Builder for ChatMessage
#[derive(Debug)]
pub struct ChatMessageBuilder {
    role: ChatRole,
    content: String,
}

impl ChatMessageBuilder {
    /// Create a new ChatMessageBuilder with specified role
    pub fn new(role: ChatRole) -> Self {
        Self {
            role,
            content: String::new(),
        }
    }

    /// Set the message content
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Build the ChatMessage
    pub fn build(self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content,
        }
    }
}
