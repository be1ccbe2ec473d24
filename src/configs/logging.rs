use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub filters: Option<String>,
    pub file: Option<FileLogConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FileLogConfig {
    pub path: String,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Rotated files kept next to the live log (`bot.log.1` ...).
    #[serde(default = "default_backups")]
    pub backups: u32,
}

fn default_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_backups() -> u32 {
    5
}
