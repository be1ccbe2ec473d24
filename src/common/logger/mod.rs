use std::{fs, path::Path};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;
pub mod writer;

pub use formatter::*;
pub(crate) use writer::*;

use crate::configs::Config;

/// Third-party targets that are only interesting when something breaks.
const QUIET_TARGETS: &str = "serenity=warn,songbird=warn,tungstenite=warn";

fn filter_directives(level: &str, filters: &str) -> String {
    if filters.is_empty() {
        format!("{},{}", level, QUIET_TARGETS)
    } else {
        format!("{},{},{}", level, QUIET_TARGETS, filters)
    }
}

/// Installs the global subscriber: coloured stdout plus an optional rotating
/// plain-text file. `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &Config) {
    let log_level = config
        .logging
        .as_ref()
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info");

    let filters = config
        .logging
        .as_ref()
        .and_then(|l| l.filters.as_deref())
        .unwrap_or("");

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level, filters)));

    let stdout_layer = fmt::layer()
        .event_format(CustomFormatter::new(true))
        .with_ansi(true);

    let file_layer = config
        .logging
        .as_ref()
        .and_then(|l| l.file.as_ref())
        .map(|file_config| {
            if let Some(parent) = Path::new(&file_config.path).parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!("Failed to create log directory: {}", e);
                }
            }

            let writer = RotatingFileWriter::new(
                &file_config.path,
                file_config.max_bytes,
                file_config.backups,
            );
            fmt::layer()
                .with_writer(writer)
                .event_format(CustomFormatter::new(false))
                .with_ansi(false)
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}
