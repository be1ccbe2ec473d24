use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::VoicePool;
use crate::common::types::SessionKey;

/// Background sweep that disconnects idle sessions.
///
/// Holds only a weak reference to the pool, so it also winds down on its own
/// once the pool is dropped.
pub(super) struct Reaper {
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

impl Reaper {
    pub(super) fn spawn(pool: Weak<VoicePool>, interval: Duration) -> Self {
        let cancel_token = CancellationToken::new();
        let cancel = cancel_token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(pool) = pool.upgrade() else { break };
                        let reaped = pool.reap_expired().await;
                        if reaped > 0 {
                            info!("Reaper disconnected {} idle session(s)", reaped);
                        }
                    }
                }
            }

            debug!("Reaper stopped");
        });

        Self { cancel_token, task }
    }

    fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the sweep and waits until the task has exited.
    pub(super) async fn stop(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!("Reaper task panicked: {}", e);
            }
        }
    }
}

impl VoicePool {
    /// Starts the idle sweep. No-op while one is already running.
    pub fn start_reaper(self: &Arc<Self>) {
        let mut slot = self.reaper.lock();
        if slot.as_ref().is_some_and(|r| !r.is_finished()) {
            return;
        }

        *slot = Some(Reaper::spawn(
            Arc::downgrade(self),
            self.config.reaper_interval(),
        ));
        info!(
            interval = ?self.config.reaper_interval(),
            timeout = ?self.config.session_timeout(),
            "Session reaper started"
        );
    }

    pub fn reaper_running(&self) -> bool {
        self.reaper
            .lock()
            .as_ref()
            .is_some_and(|r| !r.is_finished())
    }

    /// One sweep: disconnects sessions older than the idle timeout that are
    /// not playing. Returns how many were removed.
    pub(super) async fn reap_expired(&self) -> usize {
        let timeout = self.config.session_timeout();
        let expired: Vec<SessionKey> = self
            .registry
            .all()
            .iter()
            .filter(|s| s.age() > timeout && !s.is_playing())
            .map(|s| s.key())
            .collect();

        let mut reaped = 0;
        for key in expired {
            let slot = self.locks.channel(key);
            let Some(_gate) = slot.try_lock() else {
                debug!(guild_id = %key.guild_id, channel_id = %key.channel_id, "Expired session busy, next sweep");
                continue;
            };

            let still_expired = self
                .registry
                .get(&key)
                .is_some_and(|s| s.age() > timeout && !s.is_playing());
            if !still_expired {
                continue;
            }

            self.teardown(key, true).await;
            info!(guild_id = %key.guild_id, channel_id = %key.channel_id, "Reaped idle session");
            reaped += 1;
        }

        reaped
    }
}
