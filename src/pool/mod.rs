//! Voice session pool.
//!
//! Tracks one session per guild/channel pair, serializes connect decisions
//! per key, caps sessions per guild, and reclaims idle sessions on a timer.
//!
//! Lock order is always key gate, then guild admission lock, then (try only)
//! a victim's key gate. Nothing ever blocks on a second key gate.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

mod admission;
mod backoff;
mod connect;
mod locks;
mod playback;
mod reaper;
mod registry;
mod session;


pub use session::Session;

use self::{locks::LockTable, reaper::Reaper, registry::Registry};
use crate::{
    common::types::{ChannelId, GuildId, SessionKey},
    configs::VoiceConfig,
    transport::VoiceConnector,
};

/// Point-in-time counters for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub total_sessions: usize,
    pub total_playing: usize,
}

pub struct VoicePool {
    config: VoiceConfig,
    connector: Arc<dyn VoiceConnector>,
    registry: Arc<Registry>,
    locks: LockTable,
    reaper: Mutex<Option<Reaper>>,
}

impl VoicePool {
    pub fn new(config: VoiceConfig, connector: Arc<dyn VoiceConnector>) -> Arc<Self> {
        Arc::new(Self {
            config,
            connector,
            registry: Arc::new(Registry::default()),
            locks: LockTable::default(),
            reaper: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn get_session(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<Arc<Session>> {
        self.registry.get(&SessionKey::new(guild_id, channel_id))
    }

    pub fn guild_sessions(&self, guild_id: GuildId) -> Vec<Arc<Session>> {
        self.registry.guild_sessions(guild_id)
    }

    /// Whether a playback is in flight on the channel.
    pub fn is_playing(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.registry
            .is_playing(&SessionKey::new(guild_id, channel_id))
    }

    pub fn guild_session_count(&self, guild_id: GuildId) -> usize {
        self.registry.guild_session_count(guild_id)
    }

    pub fn total_sessions(&self) -> usize {
        self.registry.total_sessions()
    }

    pub fn total_playing(&self) -> usize {
        self.registry.total_playing()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_sessions: self.total_sessions(),
            total_playing: self.total_playing(),
        }
    }

    /// Leaves the channel. Best effort: the key is gone from the registry
    /// afterwards even if the transport fails to close.
    pub async fn disconnect(&self, guild_id: GuildId, channel_id: ChannelId, force: bool) {
        let key = SessionKey::new(guild_id, channel_id);
        let slot = self.locks.channel(key);
        let _gate = slot.lock().await;
        self.teardown(key, force).await;
    }

    pub async fn disconnect_guild(&self, guild_id: GuildId) {
        let keys: Vec<_> = self
            .registry
            .guild_sessions(guild_id)
            .iter()
            .map(|s| s.key())
            .collect();

        for key in keys {
            self.disconnect(key.guild_id, key.channel_id, true).await;
        }
    }

    /// Stops the reaper, waits for it, then drops every session.
    pub async fn cleanup_all(&self) {
        info!("Cleaning up all voice sessions...");

        let reaper = self.reaper.lock().take();
        if let Some(reaper) = reaper {
            reaper.stop().await;
        }

        for key in self.registry.keys() {
            self.disconnect(key.guild_id, key.channel_id, true).await;
        }

        self.registry.clear();
        info!("Voice cleanup completed");
    }

    /// Removes the session and closes its transport. Caller holds the key gate.
    async fn teardown(&self, key: SessionKey, force: bool) {
        if let Some(session) = self.registry.remove(&key) {
            if session.is_playing() {
                session.handle().stop();
            }

            if session.is_connected() {
                if let Err(e) = session.handle().disconnect(force).await {
                    warn!(
                        guild_id = %key.guild_id,
                        channel_id = %key.channel_id,
                        session = %session.id,
                        "Disconnect failed, session dropped anyway: {}",
                        e
                    );
                }
            }

            info!(
                guild_id = %key.guild_id,
                channel_id = %key.channel_id,
                session = %session.id,
                "Left voice channel"
            );
        } else {
            debug!(guild_id = %key.guild_id, channel_id = %key.channel_id, "No session to disconnect");
        }

        self.registry.clear_playback(&key);
    }
}
