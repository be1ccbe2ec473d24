//! Voice session pool for a join-chime bot.
//!
//! When a member joins a voice channel the bot connects, plays that member's
//! stored clip, and leaves. [`pool::VoicePool`] owns the voice sessions;
//! [`events::ChimeBot`] turns gateway events into pool calls.

pub mod clips;
pub mod common;
pub mod configs;
pub mod events;
pub mod pool;
pub mod transport;

pub use events::{BotStatus, ChimeBot, JoinOutcome, VoiceEvent, VoiceStateUpdate};
pub use pool::{PoolStats, Session, VoicePool};
