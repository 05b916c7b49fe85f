//! Periodic eviction of idle conversations.

use std::{sync::Arc, time::Duration};

use {
    tokio::{
        task::JoinHandle,
        time::{Instant, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::store::ConversationStore;

/// Spawn the idle reaper.
///
/// Every `interval` it evicts conversations idle for longer than
/// `idle_timeout`. The task exits when `cancel` is cancelled.
///
/// `interval` must be non-zero: tokio panics when building a zero-period
/// interval.
pub fn spawn_reaper(
    store: Arc<ConversationStore>,
    interval: Duration,
    idle_timeout: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("conversation reaper stopped");
                    break;
                },
                _ = ticker.tick() => {
                    let evicted = store.evict_idle(Instant::now(), idle_timeout);
                    debug!(
                        evicted = evicted.len(),
                        remaining = store.len(),
                        "reaped idle conversations"
                    );
                },
            }
        }
    })
}
