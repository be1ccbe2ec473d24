use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{common::errors::ConfigError, configs::*};

pub const TOKEN_ENV_VAR: &str = "DISCORD_BOT_TOKEN";

const TOKEN_PLACEHOLDER: &str = "YOUR_DISCORD_BOT_TOKEN_HERE";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = if Path::new("config.toml").exists() {
            "config.toml"
        } else if Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err(ConfigError::NotFound);
        };

        Self::load_from(config_path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        println!("Loading configuration from: {}", path.display());

        let config_str = std::fs::read_to_string(path)?;
        Self::parse(&config_str).map_err(|e| match e {
            ConfigError::Empty(_) => ConfigError::Empty(path.display().to_string()),
            other => other,
        })
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Err(ConfigError::Empty("config".into()));
        }
        let config: Self = toml::from_str(raw)?;
        config.voice.validate()?;
        Ok(config)
    }

    /// Bot token from the environment, falling back to `bot.token`.
    pub fn token(&self) -> Result<String, ConfigError> {
        let from_env = std::env::var(TOKEN_ENV_VAR).ok();
        resolve_token(from_env.as_deref(), self.bot.token.as_deref())
    }
}

fn resolve_token(env: Option<&str>, file: Option<&str>) -> Result<String, ConfigError> {
    [env, file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty() && *t != TOKEN_PLACEHOLDER)
        .map(String::from)
        .ok_or(ConfigError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::parse("[bot]\nclips_dir = \"clips\"\n").expect("parse");
        assert_eq!(config.bot.clips_dir, "clips");
        assert_eq!(config.voice.max_sessions_per_guild, 5);
        assert_eq!(config.voice.session_timeout_secs, 60);
        assert_eq!(config.voice.connection_timeout_secs, 15);
        assert_eq!(config.voice.max_retries, 3);
        assert_eq!(config.voice.reaper_interval_secs, 30);
        assert_eq!(config.voice.playback_timeout_secs, 30);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_voice_overrides() {
        let raw = r#"
            [voice]
            max_sessions_per_guild = 2
            session_timeout_secs = 90
            max_retries = 5

            [logging]
            level = "debug"

            [logging.file]
            path = "logs/bot.log"
        "#;
        let config = Config::parse(raw).expect("parse");
        assert_eq!(config.voice.max_sessions_per_guild, 2);
        assert_eq!(config.voice.session_timeout(), std::time::Duration::from_secs(90));
        assert_eq!(config.voice.max_retries, 5);
        assert_eq!(config.voice.connection_timeout_secs, 15);

        let logging = config.logging.expect("logging section");
        assert_eq!(logging.level.as_deref(), Some("debug"));
        let file = logging.file.expect("file section");
        assert_eq!(file.max_bytes, 10 * 1024 * 1024);
        assert_eq!(file.backups, 5);
    }

    #[test]
    fn test_empty_config_is_rejected() {
        assert!(matches!(Config::parse("  \n"), Err(ConfigError::Empty(_))));
    }

    #[test]
    fn test_malformed_config_is_a_parse_error() {
        assert!(matches!(
            Config::parse("[voice]\nmax_retries = \"three\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_voice_settings_are_rejected() {
        for field in [
            "max_sessions_per_guild",
            "connection_timeout_secs",
            "max_retries",
            "retry_base_delay_secs",
            "reaper_interval_secs",
            "playback_timeout_secs",
        ] {
            let raw = format!("[voice]\n{} = 0\n", field);
            match Config::parse(&raw) {
                Err(ConfigError::Invalid(msg)) => assert!(msg.contains(field), "{}", msg),
                other => panic!("{} = 0 was accepted: {:?}", field, other.map(|_| ())),
            }
        }

        let config = Config::parse("[voice]\nconnection_grace_secs = 0\n").expect("grace may be zero");
        assert_eq!(config.voice.attempt_deadline(), std::time::Duration::from_secs(15));
    }

    #[test]
    fn test_token_resolution_order() {
        assert_eq!(resolve_token(Some("env"), Some("file")).unwrap(), "env");
        assert_eq!(resolve_token(Some("  "), Some("file")).unwrap(), "file");
        assert_eq!(resolve_token(None, Some("file")).unwrap(), "file");
        assert!(matches!(
            resolve_token(Some(TOKEN_PLACEHOLDER), None),
            Err(ConfigError::MissingToken)
        ));
        assert!(matches!(resolve_token(None, None), Err(ConfigError::MissingToken)));
    }
}
