//! Discord relay for synapse.
//!
//! The serenity handler turns gateway events into [`types::InboundMessage`]s
//! and queues them for a single dispatcher task, which runs the [`Router`]
//! one message at a time. Replies go back through the
//! [`outbound::ReplyOutbound`] seam so the router itself never touches
//! serenity.

pub mod attachments;
pub mod bot;
pub mod error;
pub mod handler;
pub mod markdown;
pub mod outbound;
pub mod router;
pub mod types;

pub use {
    bot::{ReaperConfig, RelayBot, start_bot},
    error::{Error, Result},
    router::{Router, RouterConfig},
};
