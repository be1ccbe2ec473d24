use std::sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

use crate::common::{
    errors::PoolError,
    types::{GuildId, SessionKey},
};

/// What the last finished connect sequence on a key produced.
#[derive(Default)]
pub(super) struct AttemptLog {
    pub last_failure: Option<PoolError>,
}

/// Per-key gate. Holding `gate` is the right to decide connect, reuse,
/// eviction or removal for the key.
#[derive(Default)]
pub(super) struct KeySlot {
    gate: Mutex<AttemptLog>,
    /// Bumped every time a connect sequence finishes, under `gate`.
    generation: AtomicU64,
}

impl KeySlot {
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn lock(&self) -> MutexGuard<'_, AttemptLog> {
        self.gate.lock().await
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, AttemptLog>> {
        self.gate.try_lock().ok()
    }

    /// Records the outcome of a connect sequence. Caller holds the gate.
    pub fn finish(&self, log: &mut AttemptLog, failure: Option<PoolError>) {
        log.last_failure = failure;
        self.generation.fetch_add(1, Ordering::Release);
    }
}

/// Per-guild admission state.
#[derive(Default)]
pub(super) struct GuildSlot {
    admission: Mutex<()>,
    /// Connects admitted but not yet registered.
    pending: AtomicUsize,
}

impl GuildSlot {
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.admission.lock().await
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Counts one admitted connect against the guild until the ticket drops.
    pub fn reserve(self: &Arc<Self>) -> AdmissionTicket {
        self.pending.fetch_add(1, Ordering::AcqRel);
        AdmissionTicket { slot: self.clone() }
    }
}

/// A seat in the guild held by a connect that has not registered yet.
pub(super) struct AdmissionTicket {
    slot: Arc<GuildSlot>,
}

impl Drop for AdmissionTicket {
    fn drop(&mut self) {
        self.slot.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Lazily created locks, kept for the life of the pool.
#[derive(Default)]
pub(super) struct LockTable {
    channels: DashMap<SessionKey, Arc<KeySlot>>,
    guilds: DashMap<GuildId, Arc<GuildSlot>>,
}

impl LockTable {
    pub fn channel(&self, key: SessionKey) -> Arc<KeySlot> {
        self.channels.entry(key).or_default().value().clone()
    }

    pub fn guild(&self, guild_id: GuildId) -> Arc<GuildSlot> {
        self.guilds.entry(guild_id).or_default().value().clone()
    }
}
