//! Log setup: console plus an append-only file under `<exe_dir>/logs/`.
//!
//! Both outputs use the same short local timestamp. Verbosity follows
//! `RUST_LOG`, defaulting to `info`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "relic_scanner.log";
const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Local wall-clock time, e.g. `14:03:27.512`.
#[derive(Debug, Clone, Copy, Default)]
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format(TIME_FORMAT))
    }
}

/// Installs the global subscriber. Later calls are no-ops.
///
/// When the log file cannot be opened, logging continues on the console only.
pub fn init_logging(log_dir: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime)
        .with_target(false);

    let log_path = log_dir.join(LOG_FILE_NAME);
    let file_layer = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_timer(LocalTime),
        ),
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", log_path.display(), e);
            None
        }
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_logging_twice_is_harmless() {
        let dir = tempdir().unwrap();
        init_logging(dir.path());
        init_logging(dir.path());
        tracing::info!("logging initialised");
        assert!(dir.path().join(LOG_FILE_NAME).exists());
    }

    #[test]
    fn test_local_time_format() {
        let mut buf = String::new();
        LocalTime.format_time(&mut Writer::new(&mut buf)).unwrap();

        let (hms, millis) = buf.split_once('.').unwrap();
        assert_eq!(hms.split(':').count(), 3);
        assert_eq!(millis.len(), 3);
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
    }
}
