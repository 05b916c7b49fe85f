//! Per-message relay logic.
//!
//! The router decides what to do with one [`InboundMessage`]: forget the
//! channel's history, relay an image to the vision model, or continue the
//! channel's text conversation. It only talks to the platform through
//! [`ReplyOutbound`] and to the models through [`RelayModels`].

use std::{sync::Arc, time::Duration};

use {
    synapse_agents::{Content, RelayModels, chat_contents},
    synapse_common::ChannelId,
    synapse_config::DiscordConfig,
    synapse_sessions::ConversationStore,
    tokio::{sync::mpsc, task::JoinHandle, time::Instant},
    tokio_util::sync::{CancellationToken, DropGuard},
    tracing::{debug, info, warn},
};

use crate::{
    attachments::ImageFetcher,
    error::{Context, Error, Result},
    markdown::{chunk_message, strip_markup},
    outbound::ReplyOutbound,
    types::{Attachment, InboundMessage, MessageId},
};

pub const FORGET_CONFIRMATION: &str = "Message history for this channel has been erased.";
pub const IMAGE_DOWNLOAD_FAILED: &str = "Unable to download the image.";
pub const DEFAULT_IMAGE_PROMPT: &str = "What is this a picture of?";
pub const FAILURE_MARKER: &str = "❌";
pub const SEEN_REACTION: char = '👀';

/// Discord clears a typing indicator after about ten seconds.
pub const TYPING_REFRESH: Duration = Duration::from_secs(8);

/// Discord rejects messages longer than this.
const MAX_CHUNK_CHARS: usize = 2000;

/// Router settings derived from the `[discord]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// The only channel relayed to the model.
    pub channel_id: ChannelId,
    pub command_prefix: String,
    pub chunk_chars: usize,
}

impl RouterConfig {
    pub fn from_config(config: &DiscordConfig) -> Result<Self> {
        let channel_id = config
            .channel_id
            .context("discord.channel_id is not configured")?;
        if !(1..=MAX_CHUNK_CHARS).contains(&config.reply_chunk_chars) {
            return Err(Error::message(format!(
                "discord.reply_chunk_chars must be between 1 and {MAX_CHUNK_CHARS}, got {}",
                config.reply_chunk_chars
            )));
        }
        Ok(Self {
            channel_id,
            command_prefix: config.command_prefix.clone(),
            chunk_chars: config.reply_chunk_chars,
        })
    }

    fn forget_command(&self) -> String {
        format!("{}forget", self.command_prefix)
    }
}

pub struct Router {
    config: RouterConfig,
    store: Arc<ConversationStore>,
    models: RelayModels,
    outbound: Arc<dyn ReplyOutbound>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl Router {
    pub fn new(
        config: RouterConfig,
        store: Arc<ConversationStore>,
        models: RelayModels,
        outbound: Arc<dyn ReplyOutbound>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            config,
            store,
            models,
            outbound,
            fetcher,
        }
    }

    /// Process one inbound message to completion.
    ///
    /// Model failures are handled here; an `Err` means the platform refused
    /// one of our outbound calls.
    pub async fn handle(&self, msg: InboundMessage) -> Result<()> {
        if msg.from_self {
            return Ok(());
        }

        self.store.touch(msg.channel_id, Instant::now());

        if msg.content.trim() == self.config.forget_command() {
            let removed = self.store.forget(msg.channel_id);
            info!(channel = %msg.channel_id, removed, "conversation forgotten");
            return self.outbound.send(msg.channel_id, FORGET_CONFIRMATION).await;
        }

        if msg.channel_id != self.config.channel_id {
            return Ok(());
        }

        let image = msg.attachments.iter().find(|a| a.is_image()).cloned();
        let kind = if image.is_some() {
            "image"
        } else {
            "text"
        };
        info!(author = msg.author_id, channel = %msg.channel_id, kind, "inbound message");

        let _typing = self.keep_typing(msg.channel_id).await;

        match image {
            Some(attachment) => self.relay_image(&msg, &attachment).await,
            None => self.relay_text(&msg).await,
        }
    }

    async fn relay_text(&self, msg: &InboundMessage) -> Result<()> {
        let text = strip_markup(&msg.content);
        if text.trim().is_empty() {
            debug!(channel = %msg.channel_id, "nothing left to send after stripping markup");
            return Ok(());
        }

        let state = self.store.get_or_create(msg.channel_id, Instant::now());
        let contents = chat_contents(&state.history, &text);

        let reply = match self.models.text.generate(&contents).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    channel = %msg.channel_id,
                    model = self.models.text.id(),
                    error = %e,
                    "text model call failed"
                );
                return Ok(());
            },
        };

        if !self
            .store
            .append_exchange(msg.channel_id, text, reply.as_str(), Instant::now())
        {
            debug!(channel = %msg.channel_id, "conversation dropped before reply was recorded");
        }

        self.send_chunked(msg, &reply).await
    }

    async fn relay_image(&self, msg: &InboundMessage, attachment: &Attachment) -> Result<()> {
        if let Err(e) = self
            .outbound
            .react(msg.channel_id, msg.message_id, SEEN_REACTION)
            .await
        {
            debug!(error = %e, "failed to add reaction");
        }

        let data = match self.fetcher.fetch(&attachment.url).await {
            Ok(data) => data,
            Err(e) => {
                warn!(url = %attachment.url, error = %e, "attachment download failed");
                return self
                    .outbound
                    .send(msg.channel_id, IMAGE_DOWNLOAD_FAILED)
                    .await;
            },
        };

        let prompt = if msg.content.trim().is_empty() {
            DEFAULT_IMAGE_PROMPT
        } else {
            msg.content.as_str()
        };
        let contents = [Content::user_with_image(
            attachment.image_mime_type(),
            data,
            prompt,
        )];

        match self.models.image.generate(&contents).await {
            Ok(reply) => self.send_chunked(msg, &reply).await,
            Err(e) => {
                warn!(
                    channel = %msg.channel_id,
                    model = self.models.image.id(),
                    error = %e,
                    "image model call failed"
                );
                self.send_chunked(msg, &format!("{FAILURE_MARKER} {e}"))
                    .await
            },
        }
    }

    /// Show the typing indicator now and refresh it until the returned
    /// guard is dropped.
    async fn keep_typing(&self, channel: ChannelId) -> DropGuard {
        if let Err(e) = self.outbound.send_typing(channel).await {
            debug!(error = %e, "failed to send typing indicator");
        }

        let stop = CancellationToken::new();
        let outbound = Arc::clone(&self.outbound);
        let stopped = stop.clone();
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + TYPING_REFRESH, TYPING_REFRESH);
            loop {
                tokio::select! {
                    () = stopped.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = outbound.send_typing(channel).await {
                            debug!(error = %e, "failed to refresh typing indicator");
                        }
                    },
                }
            }
        });
        stop.drop_guard()
    }

    /// Send `text` as a chain of replies, each answering the previous one.
    async fn send_chunked(&self, msg: &InboundMessage, text: &str) -> Result<()> {
        let mut anchor: MessageId = msg.message_id;
        for chunk in chunk_message(text, self.config.chunk_chars) {
            anchor = self.outbound.reply(msg.channel_id, anchor, &chunk).await?;
        }
        Ok(())
    }
}

/// Spawn the single task that runs the router for queued messages in order.
pub fn spawn_dispatcher(
    router: Arc<Router>,
    mut inbound: mpsc::Receiver<InboundMessage>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                () = cancel.cancelled() => break,
                msg = inbound.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            let channel = msg.channel_id;
            if let Err(e) = router.handle(msg).await {
                warn!(%channel, error = %e, "relay turn failed");
            }
        }
        info!("message dispatcher stopped");
    })
}
