use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::errors::ConfigError;

/// Tuning for the voice session pool. Every timeout is in whole seconds.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VoiceConfig {
    #[serde(default = "default_max_sessions_per_guild")]
    pub max_sessions_per_guild: usize,
    /// Idle age after which the reaper disconnects a session.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Timeout handed to the transport for a single connect attempt.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    /// Extra margin on top of `connection_timeout_secs` before an attempt is abandoned.
    #[serde(default = "default_connection_grace_secs")]
    pub connection_grace_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: u64,
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    /// Ceiling on waiting for a clip to finish before it is stopped.
    #[serde(default = "default_playback_timeout_secs")]
    pub playback_timeout_secs: u64,
}

impl VoiceConfig {
    /// Rejects settings that would stall or disable the pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let must_be_positive = [
            ("max_sessions_per_guild", self.max_sessions_per_guild as u64),
            ("connection_timeout_secs", self.connection_timeout_secs),
            ("max_retries", u64::from(self.max_retries)),
            ("retry_base_delay_secs", self.retry_base_delay_secs),
            ("reaper_interval_secs", self.reaper_interval_secs),
            ("playback_timeout_secs", self.playback_timeout_secs),
        ];

        match must_be_positive.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::Invalid(format!("voice.{} must be at least 1", name))),
            None => Ok(()),
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Total wait for one attempt: transport timeout plus grace.
    pub fn attempt_deadline(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs + self.connection_grace_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_secs(self.retry_base_delay_secs)
    }

    /// Never zero; `tokio::time::interval` panics on a zero period.
    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs.max(1))
    }

    pub fn playback_timeout(&self) -> Duration {
        Duration::from_secs(self.playback_timeout_secs)
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_guild: default_max_sessions_per_guild(),
            session_timeout_secs: default_session_timeout_secs(),
            connection_timeout_secs: default_connection_timeout_secs(),
            connection_grace_secs: default_connection_grace_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_secs: default_retry_base_delay_secs(),
            reaper_interval_secs: default_reaper_interval_secs(),
            playback_timeout_secs: default_playback_timeout_secs(),
        }
    }
}

fn default_max_sessions_per_guild() -> usize {
    5
}

fn default_session_timeout_secs() -> u64 {
    60
}

fn default_connection_timeout_secs() -> u64 {
    15
}

fn default_connection_grace_secs() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_secs() -> u64 {
    1
}

fn default_reaper_interval_secs() -> u64 {
    30
}

fn default_playback_timeout_secs() -> u64 {
    30
}
