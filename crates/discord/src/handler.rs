//! Discord event handler for serenity.
//!
//! Converts gateway messages into [`InboundMessage`]s and queues them for the
//! dispatcher. No relay logic runs here.

use {
    serenity::{
        all::{ActivityData, Context, EventHandler, GatewayIntents, Message, Ready},
        async_trait,
    },
    synapse_common::ChannelId,
    tokio::sync::mpsc,
    tracing::{info, warn},
};

use crate::types::{Attachment, InboundMessage, MessageId};

/// Handler for Discord gateway events.
pub struct RelayHandler {
    inbound: mpsc::Sender<InboundMessage>,
    activity: Option<String>,
}

impl RelayHandler {
    pub fn new(inbound: mpsc::Sender<InboundMessage>, activity: Option<String>) -> Self {
        Self { inbound, activity }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }
}

/// Build the platform-neutral view of a serenity message.
pub fn inbound_message(msg: &Message, bot_user_id: u64) -> InboundMessage {
    InboundMessage {
        message_id: MessageId(msg.id.get()),
        channel_id: ChannelId(msg.channel_id.get()),
        author_id: msg.author.id.get(),
        from_self: msg.author.id.get() == bot_user_id,
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                filename: a.filename.clone(),
                url: a.url.clone(),
                content_type: a.content_type.clone(),
            })
            .collect(),
    }
}

#[async_trait]
impl EventHandler for RelayHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        if let Some(activity) = &self.activity {
            ctx.set_activity(Some(ActivityData::playing(activity.clone())));
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let bot_user_id = ctx.cache.current_user().id.get();
        let inbound = inbound_message(&msg, bot_user_id);

        // Skip before queueing to keep our own replies out of the channel.
        if inbound.from_self {
            return;
        }

        if let Err(e) = self.inbound.send(inbound).await {
            warn!(error = %e, "dispatcher is gone, dropping inbound message");
        }
    }
}
