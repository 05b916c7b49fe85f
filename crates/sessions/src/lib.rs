//! Per-channel conversation state with idle eviction.
//!
//! Conversations live only in memory: a restart forgets everything.

pub mod reaper;
pub mod store;

pub use {
    reaper::spawn_reaper,
    store::{ConversationState, ConversationStore},
};
