use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{VoicePool, backoff::Backoff, session::Session};
use crate::{
    common::{
        errors::{PoolError, TransportError},
        types::{UserId, VoiceChannel},
    },
    transport::VoiceHandle,
};

impl VoicePool {
    /// Returns the live session for the channel, connecting if needed.
    ///
    /// Only one caller per guild/channel runs this at a time. Callers that
    /// queued behind a sequence that failed get that failure back instead of
    /// starting another one.
    pub async fn connect(
        &self,
        channel: &VoiceChannel,
        user_id: UserId,
    ) -> Result<Arc<Session>, PoolError> {
        let key = channel.key();
        let slot = self.locks.channel(key);
        let seen = slot.generation();
        let mut gate = slot.lock().await;

        if let Some(existing) = self.registry.get(&key) {
            if existing.is_connected() {
                debug!(
                    guild_id = %key.guild_id,
                    channel = %channel.name,
                    session = %existing.id,
                    "Reusing voice session"
                );
                return Ok(existing);
            }

            debug!(
                guild_id = %key.guild_id,
                channel = %channel.name,
                session = %existing.id,
                "Dropping stale voice session"
            );
            self.teardown(key, true).await;
        }

        if slot.generation() != seen {
            if let Some(failure) = gate.last_failure.clone() {
                debug!(
                    guild_id = %key.guild_id,
                    channel = %channel.name,
                    "Connect attempt finished while waiting, reusing its failure"
                );
                return Err(failure);
            }
        }

        let seat = self.admit(key).await;

        let handle = match self.connect_with_retry(channel).await {
            Ok(handle) => handle,
            Err(e) => {
                slot.finish(&mut gate, Some(e.clone()));
                return Err(e);
            }
        };
        slot.finish(&mut gate, None);

        let session = Arc::new(Session::new(key, user_id, handle));
        self.registry.insert(session.clone());
        drop(seat);

        info!(
            guild_id = %key.guild_id,
            channel_id = %key.channel_id,
            user_id = %user_id,
            session = %session.id,
            "Created voice session in {}",
            channel.name
        );

        Ok(session)
    }

    async fn connect_with_retry(
        &self,
        channel: &VoiceChannel,
    ) -> Result<Arc<dyn VoiceHandle>, PoolError> {
        let attempts = self.config.max_retries.max(1);
        let deadline = self.config.attempt_deadline();
        let mut backoff = Backoff::new(self.config.retry_base_delay());
        let mut last_error = TransportError::NotConnected;

        for attempt in 1..=attempts {
            debug!(
                guild_id = %channel.guild_id,
                "Connect attempt {}/{}: {}",
                attempt, attempts, channel.name
            );

            let outcome = tokio::time::timeout(
                deadline,
                self.connector
                    .connect(channel, self.config.connection_timeout()),
            )
            .await;

            last_error = match outcome {
                Ok(Ok(handle)) => {
                    info!(guild_id = %channel.guild_id, "Connected to voice channel {}", channel.name);
                    return Ok(handle);
                }
                Ok(Err(TransportError::AlreadyConnected(current))) => {
                    if let Some(handle) = self.adopt_existing(channel) {
                        debug!(
                            guild_id = %channel.guild_id,
                            "Already connected to {}, adopting handle",
                            channel.name
                        );
                        return Ok(handle);
                    }
                    TransportError::AlreadyConnected(current)
                }
                Ok(Err(e)) => e,
                Err(_) => TransportError::Timeout(deadline),
            };

            warn!(
                guild_id = %channel.guild_id,
                "Connect attempt {} to {} failed: {}",
                attempt, channel.name, last_error
            );

            if attempt < attempts {
                let delay = backoff.next();
                debug!(guild_id = %channel.guild_id, "Retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        error!(
            guild_id = %channel.guild_id,
            "Giving up on {} after {} attempt(s): {}",
            channel.name, attempts, last_error
        );

        Err(PoolError::ConnectFailed {
            channel: channel.id,
            attempts,
            source: last_error,
        })
    }

    /// The gateway's current handle, if it is on this exact channel.
    fn adopt_existing(&self, channel: &VoiceChannel) -> Option<Arc<dyn VoiceHandle>> {
        self.connector
            .current_handle(channel.guild_id)
            .filter(|handle| handle.channel_id() == channel.id)
    }
}
