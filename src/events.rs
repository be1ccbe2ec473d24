//! Gateway events in, pool calls out.
//!
//! The gateway client translates its own callbacks into [`VoiceEvent`]s and
//! hands them to [`ChimeBot::handle`]. User-facing messages are the caller's
//! job; this layer only reports what happened.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    clips::{ClipStore, locate_ffmpeg},
    common::types::{GuildId, UserId, VoiceChannel},
    configs::Config,
    pool::VoicePool,
    transport::VoiceConnector,
};

/// A member's voice state changed.
#[derive(Debug, Clone)]
pub struct VoiceStateUpdate {
    pub user_id: UserId,
    pub is_bot: bool,
    pub before: Option<VoiceChannel>,
    pub after: Option<VoiceChannel>,
}

#[derive(Debug, Clone)]
pub enum VoiceEvent {
    StateUpdate(VoiceStateUpdate),
    /// The bot was removed from a guild.
    GuildRemoved(GuildId),
    /// The gateway connection dropped; every voice session is dead.
    GatewayDisconnected,
    Resumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Not a join we react to (bot account, leave, same channel).
    Ignored,
    NoClip,
    TranscoderMissing,
    ConnectFailed,
    Played,
    PlaybackFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    pub total_sessions: usize,
    pub total_playing: usize,
    pub stored_clips: usize,
}

pub struct ChimeBot {
    bot_user_id: UserId,
    config: Config,
    pool: Arc<VoicePool>,
    clips: ClipStore,
}

impl ChimeBot {
    pub fn new(bot_user_id: UserId, config: Config, connector: Arc<dyn VoiceConnector>) -> Self {
        let pool = VoicePool::new(config.voice.clone(), connector);
        let clips = ClipStore::from_config(&config.bot);
        Self {
            bot_user_id,
            config,
            pool,
            clips,
        }
    }

    pub fn pool(&self) -> &Arc<VoicePool> {
        &self.pool
    }

    pub fn clips(&self) -> &ClipStore {
        &self.clips
    }

    /// Prepares the clip directory and starts the idle sweep.
    pub fn start(&self) {
        if let Err(e) = self.clips.ensure_dir() {
            warn!("Could not create clip directory {}: {}", self.clips.dir().display(), e);
        }

        match locate_ffmpeg(self.config.bot.ffmpeg_path.as_deref()) {
            Ok(path) => info!("Found ffmpeg at {}", path.display()),
            Err(e) => error!("{}", e),
        }

        self.pool.start_reaper();
        info!("Voice pool ready");
    }

    pub async fn shutdown(&self) {
        info!("Shutting down...");
        self.pool.cleanup_all().await;
    }

    pub fn status(&self) -> BotStatus {
        let stats = self.pool.stats();
        BotStatus {
            total_sessions: stats.total_sessions,
            total_playing: stats.total_playing,
            stored_clips: self.clips.count(),
        }
    }

    pub fn status_json(&self) -> String {
        serde_json::to_string(&self.status()).unwrap_or_else(|_| "{}".to_string())
    }

    pub async fn handle(&self, event: VoiceEvent) -> Option<JoinOutcome> {
        match event {
            VoiceEvent::StateUpdate(update) => Some(self.on_voice_state_update(update).await),
            VoiceEvent::GuildRemoved(guild_id) => {
                info!(guild_id = %guild_id, "Removed from guild, dropping its voice sessions");
                self.pool.disconnect_guild(guild_id).await;
                None
            }
            VoiceEvent::GatewayDisconnected => {
                warn!("Gateway disconnected, dropping all voice sessions");
                let sweeping = self.pool.reaper_running();
                self.pool.cleanup_all().await;
                if sweeping {
                    self.pool.start_reaper();
                }
                None
            }
            VoiceEvent::Resumed => {
                info!("Gateway session resumed");
                None
            }
        }
    }

    async fn on_voice_state_update(&self, update: VoiceStateUpdate) -> JoinOutcome {
        if update.user_id == self.bot_user_id {
            debug!(
                "Own voice state changed: {:?} -> {:?}",
                update.before.as_ref().map(|c| &c.name),
                update.after.as_ref().map(|c| &c.name)
            );
            return JoinOutcome::Ignored;
        }
        if update.is_bot {
            return JoinOutcome::Ignored;
        }

        let Some(channel) = update.after else {
            debug!(user_id = %update.user_id, "User left voice");
            return JoinOutcome::Ignored;
        };

        let joined = update
            .before
            .as_ref()
            .is_none_or(|before| before.id != channel.id);
        if !joined {
            return JoinOutcome::Ignored;
        }

        self.on_user_join(update.user_id, channel).await
    }

    async fn on_user_join(&self, user_id: UserId, channel: VoiceChannel) -> JoinOutcome {
        let Some(clip) = self.clips.clip_for(user_id) else {
            return JoinOutcome::NoClip;
        };

        info!(
            guild_id = %channel.guild_id,
            channel_id = %channel.id,
            user_id = %user_id,
            "User joined {}, playing their clip",
            channel.name
        );

        let ffmpeg = match locate_ffmpeg(self.config.bot.ffmpeg_path.as_deref()) {
            Ok(path) => path,
            Err(e) => {
                error!("{}", e);
                return JoinOutcome::TranscoderMissing;
            }
        };

        if let Err(e) = self.pool.connect(&channel, user_id).await {
            error!(guild_id = %channel.guild_id, "Could not join {}: {}", channel.name, e);
            return JoinOutcome::ConnectFailed;
        }

        let source = self
            .clips
            .audio_source(clip, ffmpeg, &self.config.bot.ffmpeg_options);
        let played = self
            .pool
            .play_audio(channel.guild_id, channel.id, source, true)
            .await;

        self.pool.disconnect(channel.guild_id, channel.id, true).await;

        if played {
            info!(user_id = %user_id, "Clip played");
            JoinOutcome::Played
        } else {
            warn!(user_id = %user_id, "Clip could not be played");
            JoinOutcome::PlaybackFailed
        }
    }
}
