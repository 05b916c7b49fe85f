use {async_trait::async_trait, synapse_common::{Role, Turn}};

// ── Typed prompt content ────────────────────────────────────────────────────

/// A single part of a prompt: text or inline binary data (images).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

/// One role-tagged message sent to a generative model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user message with plain text.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Create a single user message carrying an image followed by a text prompt.
    pub fn user_with_image(
        mime_type: impl Into<String>,
        data: Vec<u8>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::User,
            parts: vec![
                Part::InlineData {
                    mime_type: mime_type.into(),
                    data,
                },
                Part::Text(prompt.into()),
            ],
        }
    }
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            parts: vec![Part::Text(turn.text.clone())],
        }
    }
}

/// Build the request contents for a chat call: prior history then the new
/// user message.
#[must_use]
pub fn chat_contents(history: &[Turn], message: &str) -> Vec<Content> {
    history
        .iter()
        .map(Content::from)
        .chain(std::iter::once(Content::user(message)))
        .collect()
}

/// A text-generating model backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Model identifier (e.g. "gemini-2.0-flash").
    fn id(&self) -> &str;

    /// Generate a single reply for the given contents.
    async fn generate(&self, contents: &[Content]) -> anyhow::Result<String>;
}
