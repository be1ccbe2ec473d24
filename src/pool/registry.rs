use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};

use super::session::Session;
use crate::common::types::{GuildId, SessionKey};

/// Live sessions plus the set of keys with a playback in flight.
///
/// Reads never block. Mutations of `sessions` happen only while the caller
/// holds the key's lock in the pool's lock table.
#[derive(Default)]
pub(crate) struct Registry {
    sessions: DashMap<SessionKey, Arc<Session>>,
    /// Key -> ticket of the playback currently running there.
    playbacks: DashMap<SessionKey, u64>,
    next_ticket: AtomicU64,
}

impl Registry {
    pub fn get(&self, key: &SessionKey) -> Option<Arc<Session>> {
        self.sessions.get(key).map(|s| s.value().clone())
    }

    pub fn all(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|s| s.value().clone()).collect()
    }

    pub fn keys(&self) -> Vec<SessionKey> {
        self.sessions.iter().map(|s| *s.key()).collect()
    }

    pub fn guild_sessions(&self, guild_id: GuildId) -> Vec<Arc<Session>> {
        self.sessions
            .iter()
            .filter(|s| s.key().guild_id == guild_id)
            .map(|s| s.value().clone())
            .collect()
    }

    pub fn guild_session_count(&self, guild_id: GuildId) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.key().guild_id == guild_id)
            .count()
    }

    pub fn total_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn insert(&self, session: Arc<Session>) -> Option<Arc<Session>> {
        self.sessions.insert(session.key(), session)
    }

    pub fn remove(&self, key: &SessionKey) -> Option<Arc<Session>> {
        self.sessions.remove(key).map(|(_, s)| s)
    }

    pub fn is_playing(&self, key: &SessionKey) -> bool {
        self.playbacks.contains_key(key)
    }

    pub fn total_playing(&self) -> usize {
        self.playbacks.len()
    }

    /// Claims the key for a new playback. `None` if one is already running.
    pub fn begin_playback(&self, key: SessionKey) -> Option<u64> {
        match self.playbacks.entry(key) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                slot.insert(ticket);
                Some(ticket)
            }
        }
    }

    /// Releases the key only if it still belongs to `ticket`.
    pub fn end_playback(&self, key: &SessionKey, ticket: u64) {
        self.playbacks.remove_if(key, |_, current| *current == ticket);
    }

    pub fn clear_playback(&self, key: &SessionKey) {
        self.playbacks.remove(key);
    }

    pub fn clear(&self) {
        self.sessions.clear();
        self.playbacks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::types::{ChannelId, UserId},
        transport::mock::{MockHandle, PlayMode},
    };

    fn session(guild: u64, channel: u64) -> Arc<Session> {
        let key = SessionKey::new(GuildId(guild), ChannelId(channel));
        let handle = MockHandle::new(key.channel_id, PlayMode::Endless);
        Arc::new(Session::new(key, UserId(7), handle))
    }

    #[test]
    fn test_guild_views() {
        let registry = Registry::default();
        registry.insert(session(1, 10));
        registry.insert(session(1, 11));
        registry.insert(session(2, 20));

        assert_eq!(registry.total_sessions(), 3);
        assert_eq!(registry.guild_session_count(GuildId(1)), 2);
        assert_eq!(registry.guild_session_count(GuildId(3)), 0);

        let mut channels: Vec<_> = registry
            .guild_sessions(GuildId(1))
            .iter()
            .map(|s| s.channel_id)
            .collect();
        channels.sort();
        assert_eq!(channels, vec![ChannelId(10), ChannelId(11)]);
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let registry = Registry::default();
        let first = session(1, 10);
        registry.insert(first.clone());
        let replaced = registry.insert(session(1, 10)).expect("previous entry");
        assert!(Arc::ptr_eq(&replaced, &first));
        assert_eq!(registry.total_sessions(), 1);
    }

    #[test]
    fn test_playback_claim_is_exclusive() {
        let registry = Registry::default();
        let key = SessionKey::new(GuildId(1), ChannelId(10));

        let ticket = registry.begin_playback(key).expect("first claim");
        assert!(registry.begin_playback(key).is_none());
        assert!(registry.is_playing(&key));

        registry.end_playback(&key, ticket);
        assert!(!registry.is_playing(&key));
        assert_eq!(registry.total_playing(), 0);
    }

    #[test]
    fn test_stale_ticket_does_not_release_newer_playback() {
        let registry = Registry::default();
        let key = SessionKey::new(GuildId(1), ChannelId(10));

        let old = registry.begin_playback(key).unwrap();
        registry.clear_playback(&key);
        let new = registry.begin_playback(key).unwrap();

        registry.end_playback(&key, old);
        assert!(registry.is_playing(&key));
        registry.end_playback(&key, new);
        assert!(!registry.is_playing(&key));
    }
}
