use std::time::Duration;

use thiserror::Error;

use crate::common::types::ChannelId;

/// Failures reported by the voice transport.
///
/// Cloneable so a single failed attempt sequence can be handed to every
/// caller that was queued behind it.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("voice connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("voice connection closed: {0}")]
    Closed(String),

    #[error("voice connector error: {0}")]
    Connector(String),

    /// The gateway already holds a voice connection for this guild.
    #[error("already connected to voice channel {0}")]
    AlreadyConnected(ChannelId),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("voice handle is not connected")]
    NotConnected,
}

#[derive(Debug, Clone, Error)]
pub enum PoolError {
    #[error("could not connect to channel {channel} after {attempts} attempt(s): {source}")]
    ConnectFailed {
        channel: ChannelId,
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config.toml or config.default.toml not found")]
    NotFound,

    #[error("{0} is empty")]
    Empty(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("bot token is not set (DISCORD_BOT_TOKEN)")]
    MissingToken,
}

#[derive(Debug, Error)]
pub enum ClipError {
    #[error("clip store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffmpeg not found, install it or set bot.ffmpeg_path")]
    FfmpegNotFound,
}
