use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BotConfig {
    /// Overridden by the `DISCORD_BOT_TOKEN` environment variable.
    pub token: Option<String>,
    #[serde(default = "default_clips_dir")]
    pub clips_dir: String,
    #[serde(default = "default_clip_extension")]
    pub clip_extension: String,
    pub ffmpeg_path: Option<String>,
    #[serde(default = "default_ffmpeg_options")]
    pub ffmpeg_options: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            clips_dir: default_clips_dir(),
            clip_extension: default_clip_extension(),
            ffmpeg_path: None,
            ffmpeg_options: default_ffmpeg_options(),
        }
    }
}

fn default_clips_dir() -> String {
    "downloads".to_string()
}

fn default_clip_extension() -> String {
    "webm".to_string()
}

fn default_ffmpeg_options() -> String {
    "-vn -b:a 96k".to_string()
}
