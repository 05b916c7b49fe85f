use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::{
        all::{ChannelId as DiscordChannelId, CreateMessage, MessageId as DiscordMessageId},
        http::Http,
    },
    synapse_common::ChannelId,
};

use crate::{
    error::{Error, Result},
    types::MessageId,
};

/// Everything the router sends back to the platform.
#[async_trait]
pub trait ReplyOutbound: Send + Sync {
    /// Post `text` as a reply to message `to`; returns the new message's id.
    async fn reply(&self, channel: ChannelId, to: MessageId, text: &str) -> Result<MessageId>;

    /// Post `text` to the channel without a reply reference.
    async fn send(&self, channel: ChannelId, text: &str) -> Result<()>;

    /// Add `emoji` as a reaction to `message`.
    async fn react(&self, channel: ChannelId, message: MessageId, emoji: char) -> Result<()>;

    /// Send a "typing" indicator. No-op by default.
    async fn send_typing(&self, _channel: ChannelId) -> Result<()> {
        Ok(())
    }
}

/// [`ReplyOutbound`] backed by serenity's REST client.
pub struct DiscordOutbound {
    http: Arc<Http>,
}

impl DiscordOutbound {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn discord_channel(channel: ChannelId) -> Result<DiscordChannelId> {
    if channel.get() == 0 {
        return Err(Error::message("discord channel id must be non-zero"));
    }
    Ok(DiscordChannelId::new(channel.get()))
}

fn discord_message(message: MessageId) -> Result<DiscordMessageId> {
    if message.0 == 0 {
        return Err(Error::message("discord message id must be non-zero"));
    }
    Ok(DiscordMessageId::new(message.0))
}

#[async_trait]
impl ReplyOutbound for DiscordOutbound {
    async fn reply(&self, channel: ChannelId, to: MessageId, text: &str) -> Result<MessageId> {
        let channel = discord_channel(channel)?;
        let builder = CreateMessage::new()
            .content(text)
            .reference_message((channel, discord_message(to)?));
        let sent = channel.send_message(&self.http, builder).await?;
        Ok(MessageId(sent.id.get()))
    }

    async fn send(&self, channel: ChannelId, text: &str) -> Result<()> {
        discord_channel(channel)?.say(&self.http, text).await?;
        Ok(())
    }

    async fn react(&self, channel: ChannelId, message: MessageId, emoji: char) -> Result<()> {
        discord_channel(channel)?
            .create_reaction(&self.http, discord_message(message)?, emoji)
            .await?;
        Ok(())
    }

    async fn send_typing(&self, channel: ChannelId) -> Result<()> {
        discord_channel(channel)?
            .broadcast_typing(&self.http)
            .await?;
        Ok(())
    }
}
