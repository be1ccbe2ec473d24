//! Seam between the session pool and the platform's voice library.
//!
//! The gateway client owns the real connections; the pool only sees these
//! traits. Implementations must be cheap to call from any task.

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::common::{
    errors::TransportError,
    types::{ChannelId, GuildId, VoiceChannel},
};

#[cfg(test)]
pub(crate) mod mock;

/// Invoked by the transport when playback ends; `Some` carries the error.
pub type PlaybackCallback = Box<dyn FnOnce(Option<TransportError>) + Send + 'static>;

/// A clip ready to be transcoded and streamed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub path: PathBuf,
    /// Transcoder binary the transport should spawn.
    pub executable: PathBuf,
    pub options: String,
}

/// A connected voice stream. Owned by exactly one pool session.
#[async_trait]
pub trait VoiceHandle: Send + Sync {
    fn channel_id(&self) -> ChannelId;

    fn is_connected(&self) -> bool;

    /// Starts playback without waiting for it. The callback runs once when the
    /// stream ends, errors, or is stopped. If this returns `Err` the callback
    /// is dropped without being called.
    fn play(&self, source: AudioSource, on_complete: PlaybackCallback)
    -> Result<(), TransportError>;

    /// Halts the current playback, if any.
    fn stop(&self);

    async fn disconnect(&self, force: bool) -> Result<(), TransportError>;
}

#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn connect(
        &self,
        channel: &VoiceChannel,
        timeout: Duration,
    ) -> Result<Arc<dyn VoiceHandle>, TransportError>;

    /// The handle the gateway currently holds for a guild, if any. Used to
    /// adopt a connection when `connect` reports `AlreadyConnected`.
    fn current_handle(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceHandle>>;
}
