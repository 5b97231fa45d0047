//! Integration tests for Engine logging and the fatal-error path
//!
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use serial_test::serial;
use std::sync::{Arc, Mutex};
use toy_vk_engine::toyvk::log::{LogEntry, LogSeverity, Logger};
use toy_vk_engine::toyvk::{Config, Engine, Error};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Captures entries so tests can inspect them
struct CapturingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CapturingLogger {
    fn install() -> Arc<Mutex<Vec<LogEntry>>> {
        let entries = Arc::new(Mutex::new(Vec::new()));
        Engine::set_logger(Self { entries: entries.clone() });
        entries
    }
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_macros_reach_custom_logger() {
    let entries = CapturingLogger::install();

    toy_vk_engine::engine_debug!("toyvk::test", "slot {} acquired", 1);
    toy_vk_engine::engine_warn!("toyvk::test", "slow frame");
    toy_vk_engine::engine_error!("toyvk::test", "submit failed");

    let captured = entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert_eq!(captured.len(), 3);
    assert_eq!(captured[0].severity, LogSeverity::Debug);
    assert_eq!(captured[0].message, "slot 1 acquired");
    assert_eq!(captured[1].severity, LogSeverity::Warn);
    assert!(captured[1].file.is_none());

    // Only errors carry their call site
    assert_eq!(captured[2].severity, LogSeverity::Error);
    assert_eq!(captured[2].file, Some(file!()));
    assert!(captured[2].line.is_some());
}

#[test]
#[serial]
fn test_integration_config_error_is_logged_where_raised() {
    let entries = CapturingLogger::install();

    let config = Config { frames_in_flight: 0, ..Config::default() };
    let result = config.validate();

    let captured = entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert!(matches!(result, Err(Error::Configuration(_))));
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[0].source, "toyvk::config");
    assert!(captured[0].message.contains("frames_in_flight"));
    assert!(captured[0].file.is_some());
}

#[test]
#[serial]
fn test_integration_fatal_report_names_error_class() {
    let entries = CapturingLogger::install();

    let message = Engine::report_fatal(&Error::Synchronization("vkQueuePresentKHR returned -4".to_string()));

    let captured = entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[0].message, message);
    assert!(message.contains("synchronization"));
    assert!(message.contains("vkQueuePresentKHR returned -4"));
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let entries = CapturingLogger::install();
    Engine::log(LogSeverity::Info, "test", "Message 1".to_string());
    Engine::reset_logger();

    // Goes to the default console logger
    Engine::log(LogSeverity::Info, "test", "Message 2".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}
