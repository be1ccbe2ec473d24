use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    common::types::{ChannelId, GuildId, SessionKey, UserId},
    transport::VoiceHandle,
};

/// One live voice connection and its bookkeeping.
pub struct Session {
    /// Correlates log lines for this connection across reuse and teardown.
    pub id: Uuid,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    /// Who triggered the connection. Informational only.
    pub user_id: UserId,
    handle: Arc<dyn VoiceHandle>,
    started_at: Instant,
    playing: AtomicBool,
}

impl Session {
    pub(crate) fn new(key: SessionKey, user_id: UserId, handle: Arc<dyn VoiceHandle>) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id: key.guild_id,
            channel_id: key.channel_id,
            user_id,
            handle,
            started_at: Instant::now(),
            playing: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.guild_id, self.channel_id)
    }

    pub fn handle(&self) -> &Arc<dyn VoiceHandle> {
        &self.handle
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub(super) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("user_id", &self.user_id)
            .field("age", &self.age())
            .field("is_playing", &self.is_playing())
            .finish_non_exhaustive()
    }
}
