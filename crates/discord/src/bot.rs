use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    serenity::{Client, all::ShardManager},
    synapse_agents::RelayModels,
    synapse_config::{ConversationConfig, SynapseConfig},
    synapse_sessions::{ConversationStore, spawn_reaper},
    tokio::{sync::mpsc, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use crate::{
    attachments::{DOWNLOAD_TIMEOUT, HttpImageFetcher},
    error::{Error, Result},
    handler::RelayHandler,
    outbound::DiscordOutbound,
    router::{Router, RouterConfig, spawn_dispatcher},
};

/// Inbound messages waiting for the dispatcher.
const INBOUND_QUEUE_CAPACITY: usize = 256;

/// Reaper timing derived from the `[conversation]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
    pub interval: Duration,
    pub idle_timeout: Duration,
}

impl ReaperConfig {
    /// Both durations must be non-zero; tokio intervals cannot tick at zero.
    pub fn from_config(config: &ConversationConfig) -> Result<Self> {
        if config.reap_interval_secs == 0 {
            return Err(Error::message(
                "conversation.reap_interval_secs must be greater than zero",
            ));
        }
        if config.idle_timeout_secs == 0 {
            return Err(Error::message(
                "conversation.idle_timeout_secs must be greater than zero",
            ));
        }
        Ok(Self {
            interval: Duration::from_secs(config.reap_interval_secs),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        })
    }
}

/// A running relay: gateway client, dispatcher and idle reaper.
pub struct RelayBot {
    cancel: CancellationToken,
    shard_manager: Arc<ShardManager>,
    tasks: Vec<JoinHandle<()>>,
}

/// Connect to Discord and start relaying.
///
/// Returns once the background tasks are spawned; the gateway connection
/// is established asynchronously.
pub async fn start_bot(config: &SynapseConfig, models: RelayModels) -> Result<RelayBot> {
    let router_config = RouterConfig::from_config(&config.discord)?;
    let reaper_config = ReaperConfig::from_config(&config.conversation)?;
    let store = Arc::new(ConversationStore::new(
        config.conversation.preamble.clone(),
    ));
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);

    let handler = RelayHandler::new(inbound_tx, config.discord.activity.clone());
    let mut client = Client::builder(
        config.discord.token.expose_secret(),
        RelayHandler::intents(),
    )
    .event_handler(handler)
    .await?;

    let router = Arc::new(Router::new(
        router_config.clone(),
        Arc::clone(&store),
        models,
        Arc::new(DiscordOutbound::new(Arc::clone(&client.http))),
        Arc::new(HttpImageFetcher::new(DOWNLOAD_TIMEOUT)),
    ));

    let cancel = CancellationToken::new();
    let shard_manager = Arc::clone(&client.shard_manager);

    let dispatcher = spawn_dispatcher(router, inbound_rx, cancel.clone());
    let reaper = spawn_reaper(
        store,
        reaper_config.interval,
        reaper_config.idle_timeout,
        cancel.clone(),
    );
    let gateway = tokio::spawn(async move {
        if let Err(e) = client.start().await {
            error!(error = %e, "discord client stopped");
        }
    });

    info!(
        channel = %router_config.channel_id,
        prefix = %router_config.command_prefix,
        "discord relay started"
    );

    Ok(RelayBot {
        cancel,
        shard_manager,
        tasks: vec![dispatcher, reaper, gateway],
    })
}

impl RelayBot {
    /// Stop the reaper and dispatcher, disconnect every shard and wait for
    /// the background tasks to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.shard_manager.shutdown_all().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "relay task ended abnormally");
            }
        }
        info!("discord relay shut down");
    }
}
