use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{VoicePool, locks::AdmissionTicket};
use crate::common::types::SessionKey;

impl VoicePool {
    /// Makes room in the guild for `requester` and reserves its seat.
    ///
    /// Sessions and connects already admitted but still in flight both count
    /// against the cap. The returned ticket holds the seat until the caller
    /// has registered its session or given up.
    ///
    /// The cap is advisory: when every session is playing nothing is
    /// evicted and the new connection goes ahead.
    pub(super) async fn admit(&self, requester: SessionKey) -> AdmissionTicket {
        let guild_id = requester.guild_id;
        let guild = self.locks.guild(guild_id);
        let _admission = guild.lock().await;

        let limit = self.config.max_sessions_per_guild;
        let occupied = || self.registry.guild_session_count(guild_id) + guild.pending();

        if occupied() >= limit {
            warn!(
                guild_id = %guild_id,
                count = occupied(),
                limit,
                "Guild session limit reached"
            );

            while occupied() >= limit {
                if !self.evict_oldest_idle(requester).await {
                    warn!(
                        guild_id = %guild_id,
                        "No idle session to evict, admitting over the limit"
                    );
                    break;
                }
            }
        }

        guild.reserve()
    }

    /// Disconnects the guild's oldest idle session. Ties go to the lower
    /// channel id. Keys whose gate is busy are skipped.
    async fn evict_oldest_idle(&self, requester: SessionKey) -> bool {
        let mut idle: Vec<_> = self
            .registry
            .guild_sessions(requester.guild_id)
            .into_iter()
            .filter(|s| s.key() != requester && !s.is_playing())
            .collect();
        idle.sort_by_key(|s| (s.started_at(), s.channel_id));

        for victim in idle {
            let key = victim.key();
            let slot = self.locks.channel(key);
            let Some(_gate) = slot.try_lock() else {
                debug!(guild_id = %key.guild_id, channel_id = %key.channel_id, "Eviction candidate busy, skipping");
                continue;
            };

            let unchanged = self
                .registry
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(&current, &victim) && !current.is_playing());
            if !unchanged {
                continue;
            }

            self.teardown(key, true).await;
            info!(
                guild_id = %key.guild_id,
                channel_id = %key.channel_id,
                session = %victim.id,
                "Evicted oldest idle session (guild limit)"
            );
            return true;
        }

        false
    }
}
