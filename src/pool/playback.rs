use std::{sync::Arc, time::Duration};

use tracing::{debug, error, warn};

use super::{VoicePool, registry::Registry, session::Session};
use crate::{
    common::{
        errors::TransportError,
        types::{ChannelId, GuildId, SessionKey},
    },
    transport::{AudioSource, PlaybackCallback},
};

/// Marks a key as playing for as long as it lives.
struct PlaybackGuard {
    registry: Arc<Registry>,
    session: Arc<Session>,
    ticket: u64,
}

impl PlaybackGuard {
    fn begin(registry: Arc<Registry>, session: Arc<Session>) -> Option<Self> {
        let ticket = registry.begin_playback(session.key())?;
        session.set_playing(true);
        Some(Self {
            registry,
            session,
            ticket,
        })
    }
}

impl Drop for PlaybackGuard {
    fn drop(&mut self) {
        self.session.set_playing(false);
        self.registry
            .end_playback(&self.session.key(), self.ticket);
    }
}

impl VoicePool {
    /// Plays `source` on the channel's session.
    ///
    /// Returns false when there is no connected session, a playback is
    /// already running on the channel, or the transport reports an error.
    /// Hitting the wait ceiling stops playback but is not an error.
    pub async fn play_audio(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        source: AudioSource,
        wait_for_completion: bool,
    ) -> bool {
        let key = SessionKey::new(guild_id, channel_id);
        let Some(session) = self.registry.get(&key).filter(|s| s.is_connected()) else {
            warn!(guild_id = %guild_id, channel_id = %channel_id, "Cannot play: no connected session");
            return false;
        };

        let Some(guard) = PlaybackGuard::begin(self.registry.clone(), session.clone()) else {
            debug!(guild_id = %guild_id, channel_id = %channel_id, "Already playing on this channel");
            return false;
        };

        let (tx, rx) = flume::bounded::<Option<TransportError>>(1);
        let on_complete: PlaybackCallback = Box::new(move |result| {
            let _ = tx.send(result);
        });

        if let Err(e) = session.handle().play(source, on_complete) {
            error!(guild_id = %guild_id, channel_id = %channel_id, "Playback failed to start: {}", e);
            return false;
        }

        let ceiling = self.config.playback_timeout();

        if !wait_for_completion {
            // The transport may have finished (or failed) synchronously.
            if let Ok(result) = rx.try_recv() {
                return log_result(&session, result);
            }

            tokio::spawn(async move {
                await_completion(&session, rx, ceiling).await;
                drop(guard);
            });
            return true;
        }

        let ok = await_completion(&session, rx, ceiling).await;
        drop(guard);
        ok
    }
}

async fn await_completion(
    session: &Session,
    rx: flume::Receiver<Option<TransportError>>,
    ceiling: Duration,
) -> bool {
    match tokio::time::timeout(ceiling, rx.recv_async()).await {
        Ok(Ok(result)) => log_result(session, result),
        Ok(Err(_)) => {
            warn!(
                guild_id = %session.guild_id,
                channel_id = %session.channel_id,
                "Transport dropped the completion callback"
            );
            false
        }
        Err(_) => {
            warn!(
                guild_id = %session.guild_id,
                channel_id = %session.channel_id,
                "Playback exceeded {:?}, stopping",
                ceiling
            );
            session.handle().stop();
            // Stopping is not a failure unless the stream had already errored.
            !matches!(rx.try_recv(), Ok(Some(_)))
        }
    }
}

fn log_result(session: &Session, result: Option<TransportError>) -> bool {
    match result {
        None => {
            debug!(
                guild_id = %session.guild_id,
                channel_id = %session.channel_id,
                "Playback finished"
            );
            true
        }
        Some(e) => {
            error!(
                guild_id = %session.guild_id,
                channel_id = %session.channel_id,
                "Playback error: {}",
                e
            );
            false
        }
    }
}
