//! Platform-neutral view of an inbound chat message.

use synapse_common::ChannelId;

/// Identifier of a single chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub u64);

/// A file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    /// MIME type reported by the platform, when known.
    pub content_type: Option<String>,
}

/// An inbound message as the router sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: u64,
    /// Authored by the bot itself.
    pub from_self: bool,
    pub content: String,
    pub attachments: Vec<Attachment>,
}
