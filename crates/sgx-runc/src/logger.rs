//! Append-only file logger.
//!
//! The wrapper runs underneath dockerd with no terminal attached, so records
//! go to a single file in logfmt, one line per record.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use log::{LevelFilter, Metadata, Record};

use crate::config::Config;

pub struct FileLogger {
    file: Mutex<File>,
    level: LevelFilter,
}

impl FileLogger {
    pub fn with_path<P: AsRef<Path>>(path: P) -> Result<FileLogger, io::Error> {
        let f = OpenOptions::new()
            .append(true)
            .create(true)
            .mode(0o644)
            .open(path)?;

        Ok(FileLogger {
            file: Mutex::new(f),
            level: LevelFilter::Trace,
        })
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Debug formatting quotes and escapes the message
        let line = format!(
            "time=\"{}\" level={} msg={:?}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            record.level().as_str().to_lowercase(),
            record.args().to_string()
        );

        // A poisoned lock still holds a usable file handle.
        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(file, "{line}");
    }

    fn flush(&self) {
        if let Ok(file) = self.file.lock() {
            let _ = file.sync_all();
        }
    }
}

/// Opens the configured log file and installs it as the global logger.
pub fn init(config: &Config) -> anyhow::Result<()> {
    let level = level_filter(&config.log_level);
    let logger = FileLogger::with_path(&config.log_file)?.with_level(level);
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);
    Ok(())
}

fn level_filter(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or(LevelFilter::Info)
}
