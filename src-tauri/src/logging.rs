//! Log output for the browser.
//!
//! Console logging goes through env_logger. With the `gui` feature the
//! [`TauriLogger`] additionally forwards every record to the frontend as a
//! `log-message` event.

use std::io::Write;

use chrono::Local;
use env_logger::filter::{Builder as FilterBuilder, Filter};
use log::LevelFilter;
use serde::Serialize;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LogMessage {
    pub level: String,
    pub message: String,
    pub timestamp: String,
}

impl LogMessage {
    pub fn from_record(record: &log::Record) -> Self {
        Self {
            level: record.level().to_string(),
            message: record.args().to_string(),
            timestamp: Local::now().to_rfc3339(),
        }
    }
}

/// Builds the record filter: `default` for every target, then the
/// directives in `rust_log` (same syntax as `RUST_LOG`) on top.
pub fn log_filter(default: LevelFilter, rust_log: Option<&str>) -> Filter {
    let mut builder = FilterBuilder::new();
    builder.filter_level(default);
    if let Some(directives) = rust_log {
        builder.parse(directives);
    }
    builder.build()
}

/// Installs env_logger with `level` as the default filter. `RUST_LOG`
/// overrides it. Calling this again is harmless.
pub fn init_logging(level: LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();

    if result.is_ok() {
        log::info!("Logging initialized at {}", level);
    }
}

#[cfg(feature = "gui")]
pub use tauri_logger::TauriLogger;

#[cfg(feature = "gui")]
mod tauri_logger {
    use std::sync::OnceLock;

    use chrono::Local;
    use env_logger::filter::Filter;
    use log::{LevelFilter, Metadata, Record, SetLoggerError};
    use tauri::Emitter;

    use super::{log_filter, LogMessage};

    static LOGGER: OnceLock<TauriLogger> = OnceLock::new();

    pub struct TauriLogger {
        app_handle: tauri::AppHandle,
        filter: Filter,
    }

    impl TauriLogger {
        /// Installs the logger with `level` as the default; `RUST_LOG`
        /// directives override it per target.
        pub fn init(app_handle: tauri::AppHandle, level: LevelFilter) -> Result<(), SetLoggerError> {
            let rust_log = std::env::var("RUST_LOG").ok();
            let logger = LOGGER.get_or_init(|| TauriLogger {
                app_handle,
                filter: log_filter(level, rust_log.as_deref()),
            });
            log::set_logger(logger).map(|()| log::set_max_level(logger.filter.filter()))
        }

        fn emit_log(&self, record: &Record) {
            if let Err(e) = self
                .app_handle
                .emit("log-message", LogMessage::from_record(record))
            {
                eprintln!("Failed to emit log message: {}", e);
            }
        }
    }

    impl log::Log for TauriLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            self.filter.enabled(metadata)
        }

        fn log(&self, record: &Record) {
            if self.filter.matches(record) {
                eprintln!(
                    "{} [{}] {}: {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    record.args()
                );
                self.emit_log(record);
            }
        }

        fn flush(&self) {}
    }
}
