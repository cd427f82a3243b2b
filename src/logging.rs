//! Tracing setup: console output plus one size-rotated log file per run

mod rotate;

use crate::config::LogLevel;
use chrono::{DateTime, Local};
use rotate::{RotatingFile, BACKUPS, MAX_BYTES};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `{log_dir}/{date}/cardassist_{date}_{time}.log`
pub fn log_file_path(log_dir: &Path, now: DateTime<Local>) -> PathBuf {
    log_dir
        .join(now.format("%Y-%m-%d").to_string())
        .join(format!("cardassist_{}.log", now.format("%Y-%m-%d_%H-%M-%S")))
}

fn filter(level: LogLevel) -> EnvFilter {
    let level = level.as_tracing();
    EnvFilter::new(format!("cardassist={level},tower_http={level}"))
}

/// Install the global subscriber and return the path of this run's log file
pub fn init(level: LogLevel, log_dir: &Path) -> io::Result<PathBuf> {
    let path = log_file_path(log_dir, Local::now());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = RotatingFile::open(&path, MAX_BYTES, BACKUPS)?;

    tracing_subscriber::registry()
        .with(filter(level))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    tracing::info!(path = %path.display(), "Logging initialized");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_layout() {
        let now = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            log_file_path(Path::new("logs"), now),
            PathBuf::from("logs/2024-03-07/cardassist_2024-03-07_09-05-01.log")
        );
    }
}
