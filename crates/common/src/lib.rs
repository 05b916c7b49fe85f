//! Shared types, error definitions, and utilities used across all synapse crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage},
    types::{ChannelId, Role, Turn},
};
