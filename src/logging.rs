//! Console and file logging behind the `log` facade.
//!
//! Every record goes to stdout and is appended to
//! `<exe_dir>/logs/rooftop_harvest.log` as `[HH:MM:SS.mmm] LEVEL message`.

use chrono::Local;
use log::{Level, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::paths;

const LOG_FILE_NAME: &str = "rooftop_harvest.log";

pub struct FileLogger {
    level: Level,
    path: PathBuf,
}

impl FileLogger {
    pub fn new(level: Level, path: PathBuf) -> Self {
        Self { level, path }
    }

    fn append(&self, line: &str) {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

fn format_line(level: Level, message: &std::fmt::Arguments) -> String {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    format!("[{}] {:<5} {}\n", timestamp, level, message)
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), record.args());
        print!("{}", line);
        self.append(&line);
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }
}

/// Maps the `-v` count to a level: Info, Debug, then Trace.
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    }
}

/// Installs the logger and a panic hook that records panics in the log file.
pub fn init(level: Level) -> anyhow::Result<()> {
    let path = paths::get_logs_dir().join(LOG_FILE_NAME);
    let logger = FileLogger::new(level, path);

    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;
    log::set_max_level(level.to_level_filter());

    install_panic_hook();
    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();

        log::error!("[PANIC]{} {}", location, msg);
        eprintln!("[PANIC]{} {}", location, msg);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;
    use tempfile::tempdir;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for_verbosity(0), Level::Info);
        assert_eq!(level_for_verbosity(1), Level::Debug);
        assert_eq!(level_for_verbosity(5), Level::Trace);
        assert_eq!(level_for_verbosity(1).to_level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_logger_appends_enabled_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.log");
        let logger = FileLogger::new(Level::Info, path.clone());

        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("Failed to process roof {}", 2))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("hidden"))
                .build(),
        );

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with('['));
        assert!(content.contains("] WARN  Failed to process roof 2"));
        assert!(!content.contains("hidden"));
    }
}
