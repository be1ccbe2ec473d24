//! Per-user clip files on disk and the transcoder that plays them.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use crate::{
    common::{errors::ClipError, types::UserId},
    configs::BotConfig,
    transport::AudioSource,
};

/// Extensions accepted for uploaded clips.
pub const SUPPORTED_AUDIO_FORMATS: &[&str] = &[
    "mp3", "webm", "mp4", "m4a", "wav", "flac", "ogg", "aac", "wma",
];

const FFMPEG_LOCATIONS: &[&str] = &[
    "/usr/bin/ffmpeg",
    "/usr/local/bin/ffmpeg",
    "/opt/ffmpeg/bin/ffmpeg",
];

pub fn is_supported_format(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_AUDIO_FORMATS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Finds ffmpeg: the configured path, then well-known locations, then `PATH`.
pub fn locate_ffmpeg(configured: Option<&str>) -> Result<PathBuf, ClipError> {
    let well_known = FFMPEG_LOCATIONS.iter().map(PathBuf::from);
    let on_path = std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join("ffmpeg"))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    configured
        .map(PathBuf::from)
        .into_iter()
        .chain(well_known)
        .chain(on_path)
        .find(|candidate| is_executable(candidate))
        .ok_or(ClipError::FfmpegNotFound)
}

/// Directory of `<user_id>.<ext>` clips.
#[derive(Debug, Clone)]
pub struct ClipStore {
    dir: PathBuf,
    extension: String,
}

impl ClipStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(&config.clips_dir, &config.clip_extension)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<(), ClipError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn clip_path(&self, user_id: UserId) -> PathBuf {
        self.dir.join(format!("{}.{}", user_id, self.extension))
    }

    /// The user's clip, if one has been stored.
    pub fn clip_for(&self, user_id: UserId) -> Option<PathBuf> {
        let path = self.clip_path(user_id);
        if path.is_file() {
            Some(path)
        } else {
            debug!(user_id = %user_id, "No clip stored");
            None
        }
    }

    /// Deletes the user's clip. Returns whether one existed.
    pub fn remove(&self, user_id: UserId) -> Result<bool, ClipError> {
        match fs::remove_file(self.clip_path(user_id)) {
            Ok(()) => {
                info!(user_id = %user_id, "Clip removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Users that currently have a clip, in ascending id order.
    pub fn users(&self) -> Result<Vec<UserId>, ClipError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut users = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                users.push(UserId(id));
            }
        }
        users.sort();
        Ok(users)
    }

    pub fn count(&self) -> usize {
        self.users().map(|u| u.len()).unwrap_or(0)
    }

    /// Builds what the transport needs to stream the clip.
    pub fn audio_source(&self, path: PathBuf, ffmpeg: PathBuf, options: &str) -> AudioSource {
        AudioSource {
            path,
            executable: ffmpeg,
            options: options.to_string(),
        }
    }
}
