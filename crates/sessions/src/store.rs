//! In-memory conversation store keyed by channel.

use std::{collections::HashMap, sync::Mutex, time::Duration};

use {
    synapse_common::{ChannelId, Turn},
    tokio::time::Instant,
};

/// Conversation history of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub channel_id: ChannelId,
    /// Preamble turns followed by every user/model exchange, oldest first.
    pub history: Vec<Turn>,
    pub last_activity: Instant,
}

#[derive(Default)]
struct Inner {
    conversations: HashMap<ChannelId, ConversationState>,
    /// Last inbound activity per channel, including channels without a
    /// conversation.
    activity: HashMap<ChannelId, Instant>,
}

/// Shared store of per-channel conversations.
///
/// Every method takes the lock for a short synchronous section and never
/// holds it across an `.await`, so the router and the reaper can share one
/// `Arc<ConversationStore>`.
pub struct ConversationStore {
    preamble: Vec<Turn>,
    inner: Mutex<Inner>,
}

impl ConversationStore {
    /// Create an empty store; new conversations start with `preamble`.
    pub fn new(preamble: Vec<Turn>) -> Self {
        Self {
            preamble,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record activity in `channel` at `now`. Timestamps never move backwards.
    pub fn touch(&self, channel: ChannelId, now: Instant) {
        let mut inner = self.lock();
        let seen = inner.activity.entry(channel).or_insert(now);
        *seen = (*seen).max(now);
        let seen = *seen;
        if let Some(state) = inner.conversations.get_mut(&channel) {
            state.last_activity = state.last_activity.max(seen);
        }
    }

    /// Return the channel's conversation, creating one seeded with the
    /// preamble if none exists.
    pub fn get_or_create(&self, channel: ChannelId, now: Instant) -> ConversationState {
        let mut inner = self.lock();
        let last_activity = inner
            .activity
            .get(&channel)
            .map_or(now, |seen| (*seen).max(now));
        inner
            .conversations
            .entry(channel)
            .or_insert_with(|| ConversationState {
                channel_id: channel,
                history: self.preamble.clone(),
                last_activity,
            })
            .clone()
    }

    /// Snapshot of the channel's conversation, if any.
    pub fn get(&self, channel: ChannelId) -> Option<ConversationState> {
        self.lock().conversations.get(&channel).cloned()
    }

    /// Append one user turn and one model turn.
    ///
    /// Returns `false` without creating anything when the conversation was
    /// forgotten or evicted while the reply was being generated.
    pub fn append_exchange(
        &self,
        channel: ChannelId,
        user: impl Into<String>,
        model: impl Into<String>,
        now: Instant,
    ) -> bool {
        let mut inner = self.lock();
        let Some(state) = inner.conversations.get_mut(&channel) else {
            return false;
        };
        state.history.push(Turn::user(user));
        state.history.push(Turn::model(model));
        state.last_activity = state.last_activity.max(now);
        true
    }

    /// Drop the channel's conversation. Absent channels are not an error;
    /// the return value only says whether something was removed.
    pub fn forget(&self, channel: ChannelId) -> bool {
        self.lock().conversations.remove(&channel).is_some()
    }

    /// Remove activity records and conversations idle for strictly longer
    /// than `timeout`, returning the channels whose conversation was evicted.
    pub fn evict_idle(&self, now: Instant, timeout: Duration) -> Vec<ChannelId> {
        let is_idle = |seen: Instant| now.saturating_duration_since(seen) > timeout;

        let mut inner = self.lock();
        inner.activity.retain(|_, seen| !is_idle(*seen));

        let mut evicted: Vec<ChannelId> = inner
            .conversations
            .values()
            .filter(|state| is_idle(state.last_activity))
            .map(|state| state.channel_id)
            .collect();
        for channel in &evicted {
            inner.conversations.remove(channel);
        }
        evicted.sort();
        evicted
    }

    /// Number of live conversations.
    pub fn len(&self) -> usize {
        self.lock().conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of channels with a recorded activity timestamp.
    pub fn tracked_channels(&self) -> usize {
        self.lock().activity.len()
    }
}
