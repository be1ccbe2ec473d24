//! Scripted in-memory transport for exercising the pool.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{AudioSource, PlaybackCallback, VoiceConnector, VoiceHandle};
use crate::common::{
    errors::TransportError,
    types::{ChannelId, GuildId, VoiceChannel},
};

/// What the next `connect` call does.
#[derive(Clone)]
pub enum ConnectStep {
    Succeed,
    Fail(TransportError),
    /// Never resolves; only the pool's deadline ends it.
    Hang,
}

/// How a handle reacts to `play`.
#[derive(Clone, Copy)]
pub enum PlayMode {
    /// Completes cleanly after the given clip length.
    Finish(Duration),
    /// Reports an error after the given delay.
    Fail(Duration),
    /// Refuses to start at all.
    Refuse,
    /// Runs until stopped or disconnected.
    Endless,
}

pub struct MockHandle {
    channel_id: ChannelId,
    connected: AtomicBool,
    play_mode: Mutex<PlayMode>,
    pending: Arc<Mutex<Option<PlaybackCallback>>>,
    fail_disconnect: AtomicBool,
    pub plays: AtomicUsize,
    pub stops: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl MockHandle {
    pub fn new(channel_id: ChannelId, play_mode: PlayMode) -> Arc<Self> {
        Arc::new(Self {
            channel_id,
            connected: AtomicBool::new(true),
            play_mode: Mutex::new(play_mode),
            pending: Arc::new(Mutex::new(None)),
            fail_disconnect: AtomicBool::new(false),
            plays: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        })
    }

    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn fail_disconnects(&self) {
        self.fail_disconnect.store(true, Ordering::SeqCst);
    }

    fn finish(&self, error: Option<TransportError>) {
        let callback = self.pending.lock().take();
        if let Some(callback) = callback {
            callback(error);
        }
    }
}

#[async_trait]
impl VoiceHandle for MockHandle {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn play(
        &self,
        _source: AudioSource,
        on_complete: PlaybackCallback,
    ) -> Result<(), TransportError> {
        let mode = *self.play_mode.lock();
        if matches!(mode, PlayMode::Refuse) {
            return Err(TransportError::Playback("refused".into()));
        }

        self.plays.fetch_add(1, Ordering::SeqCst);
        *self.pending.lock() = Some(on_complete);

        let (delay, error) = match mode {
            PlayMode::Finish(after) => (after, None),
            PlayMode::Fail(after) => (after, Some(TransportError::Playback("decoder".into()))),
            PlayMode::Refuse | PlayMode::Endless => return Ok(()),
        };

        let pending = self.pending.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let callback = pending.lock().take();
            if let Some(callback) = callback {
                callback(error);
            }
        });
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.finish(None);
    }

    async fn disconnect(&self, _force: bool) -> Result<(), TransportError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.finish(None);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(TransportError::Closed("socket already gone".into()));
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockConnector {
    script: Mutex<VecDeque<ConnectStep>>,
    /// Simulated handshake time for every attempt.
    latency: Duration,
    play_mode: Mutex<PlayMode>,
    current: DashMap<GuildId, Arc<MockHandle>>,
    handles: Mutex<Vec<Arc<MockHandle>>>,
    pub attempts: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Self::with_latency(Duration::from_millis(100))
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            latency,
            play_mode: Mutex::new(PlayMode::Finish(Duration::from_secs(3))),
            current: DashMap::new(),
            handles: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        })
    }

    /// Queues outcomes for upcoming attempts; unscripted attempts succeed.
    pub fn script(&self, steps: impl IntoIterator<Item = ConnectStep>) {
        self.script.lock().extend(steps);
    }

    pub fn set_play_mode(&self, mode: PlayMode) {
        *self.play_mode.lock() = mode;
    }

    /// Pretends the gateway already holds a connection for the guild.
    pub fn hold(&self, guild_id: GuildId, handle: Arc<MockHandle>) {
        self.current.insert(guild_id, handle);
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn handles(&self) -> Vec<Arc<MockHandle>> {
        self.handles.lock().clone()
    }

    pub fn handle_for(&self, channel_id: ChannelId) -> Option<Arc<MockHandle>> {
        self.handles
            .lock()
            .iter()
            .rev()
            .find(|h| h.channel_id == channel_id)
            .cloned()
    }
}

#[async_trait]
impl VoiceConnector for MockConnector {
    async fn connect(
        &self,
        channel: &VoiceChannel,
        _timeout: Duration,
    ) -> Result<Arc<dyn VoiceHandle>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front().unwrap_or(ConnectStep::Succeed);

        tokio::time::sleep(self.latency).await;

        match step {
            ConnectStep::Succeed => {
                let handle = MockHandle::new(channel.id, *self.play_mode.lock());
                self.handles.lock().push(handle.clone());
                self.current.insert(channel.guild_id, handle.clone());
                Ok(handle)
            }
            ConnectStep::Fail(e) => Err(e),
            ConnectStep::Hang => {
                futures::future::pending::<()>().await;
                Err(TransportError::Closed("unreachable".into()))
            }
        }
    }

    fn current_handle(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceHandle>> {
        self.current
            .get(&guild_id)
            .map(|h| h.value().clone() as Arc<dyn VoiceHandle>)
    }
}
