macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(u: u64) -> Self {
                Self(u)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(
    /// A server on the chat platform; the tenant boundary for session limits.
    GuildId
);
snowflake!(
    /// A voice channel inside a guild.
    ChannelId
);
snowflake!(UserId);

/// Registry key: one live voice session per guild/channel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

impl SessionKey {
    pub fn new(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.channel_id)
    }
}

/// A voice destination as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceChannel {
    pub guild_id: GuildId,
    pub id: ChannelId,
    pub name: String,
}

impl VoiceChannel {
    pub fn new(guild_id: GuildId, id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            guild_id,
            id,
            name: name.into(),
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.guild_id, self.id)
    }
}
