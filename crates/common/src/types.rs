//! Conversation primitives shared by the store, the providers and the router.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Stable identifier of a chat channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl ChannelId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| Error::invalid_channel_id(s))
    }
}

/// Author of a conversation turn, using the Gemini wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One role-tagged message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_parses_snowflake() {
        let id: ChannelId = "1183754224384213062".parse().unwrap();
        assert_eq!(id.get(), 1_183_754_224_384_213_062);
        assert_eq!(id.to_string(), "1183754224384213062");
    }

    #[test]
    fn channel_id_rejects_garbage() {
        let err = "general".parse::<ChannelId>().unwrap_err();
        assert_eq!(err.to_string(), "invalid channel id `general`");
    }

    #[test]
    fn turn_serializes_with_wire_role_names() {
        let json = serde_json::to_value(Turn::model("hi")).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(json["text"], "hi");

        let turn: Turn = serde_json::from_str(r#"{"role":"user","text":"who are you"}"#).unwrap();
        assert_eq!(turn, Turn::user("who are you"));
    }
}
