//! Engine singleton
//!
//! Owns the process-wide logger and the single fatal-error handler. Every
//! `Err` that reaches the top of the application ends up in `Engine::fatal`,
//! which logs a diagnostic and terminates: the renderer has no recovery path.

use crate::error::Error;
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;

/// Global logger, lazily initialized with `DefaultLogger`
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Exit status used by `Engine::fatal`
pub const FATAL_EXIT_CODE: i32 = 1;

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

/// Engine singleton (stateless facade over process-wide statics)
pub struct Engine;

impl Engine {
    // ===== FATAL ERROR HANDLING =====

    /// Log `error` as a fatal diagnostic without terminating
    ///
    /// Returns the message that was logged.
    pub fn report_fatal(error: &Error) -> String {
        let message = format!("Fatal {} error, terminating: {}", error.kind(), error);
        Self::log(LogSeverity::Error, "toyvk::Engine", message.clone());
        message
    }

    /// Single top-level error handler: log and terminate the process
    pub fn fatal(error: &Error) -> ! {
        Self::report_fatal(error);
        std::process::exit(FATAL_EXIT_CODE)
    }

    /// Unwrap `result` or route its error through `fatal`
    pub fn or_fatal<T>(result: crate::error::Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => Self::fatal(&error),
        }
    }

    // ===== LOGGING API =====

    /// Replace the global logger
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Restore the default console logger
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger::default());
        }
    }

    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Log with call-site location (used by `engine_error!`)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
