use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Appends to a log file and rotates it once it would grow past `max_bytes`.
///
/// Rotation shifts `bot.log.1 -> bot.log.2` and so on, dropping anything past
/// `backups`, then moves the live file to `bot.log.1`.
#[derive(Clone)]
pub(crate) struct RotatingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    backups: u32,
    // Serializes rotation against concurrent writers.
    lock: Arc<Mutex<()>>,
}

impl RotatingFileWriter {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, backups: u32) -> Self {
        Self {
            path: path.into(),
            max_bytes,
            backups,
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn backup_path(&self, index: u32) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&self) -> io::Result<()> {
        if self.backups == 0 {
            fs::File::create(&self.path)?;
            return Ok(());
        }

        let oldest = self.backup_path(self.backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))
    }

    fn current_len(path: &Path) -> u64 {
        fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }
}

impl io::Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let len = Self::current_len(&self.path);
        if len > 0 && len + buf.len() as u64 > self.max_bytes {
            if let Err(e) = self.rotate() {
                eprintln!("Failed to rotate log file: {}", e);
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RotatingFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotates_when_full() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bot.log");
        let mut writer = RotatingFileWriter::new(&path, 16, 2);

        writer.write_all(b"0123456789\n").unwrap();
        writer.write_all(b"abcdefghij\n").unwrap();
        writer.write_all(b"ABCDEFGHIJ\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "ABCDEFGHIJ\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("bot.log.1")).unwrap(),
            "abcdefghij\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("bot.log.2")).unwrap(),
            "0123456789\n"
        );
    }

    #[test]
    fn test_drops_oldest_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bot.log");
        let mut writer = RotatingFileWriter::new(&path, 4, 1);

        for line in ["one\n", "two\n", "six\n"] {
            writer.write_all(line.as_bytes()).unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "six\n");
        assert_eq!(
            fs::read_to_string(dir.path().join("bot.log.1")).unwrap(),
            "two\n"
        );
        assert!(!dir.path().join("bot.log.2").exists());
    }

    #[test]
    fn test_zero_backups_truncates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bot.log");
        let mut writer = RotatingFileWriter::new(&path, 4, 0);

        writer.write_all(b"one\n").unwrap();
        writer.write_all(b"two\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "two\n");
        assert!(!dir.path().join("bot.log.1").exists());
    }
}
