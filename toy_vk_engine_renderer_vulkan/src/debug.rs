/// Vulkan debug messenger - validation layer messages routed to the engine log
///
/// Compiled only with the `vulkan-validation` feature. Every message is
/// counted by severity and forwarded to the installed engine logger, so
/// tests can capture validation output the same way as engine logs.

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use toy_vk_engine::toyvk::Result;
use toy_vk_engine::{engine_debug, engine_error, engine_info, engine_warn};

use crate::vulkan::creation_error;

/// Counts of validation messages since the last device creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn record(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) {
        let counter = if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            &self.errors
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            &self.warnings
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            &self.info
        } else {
            &self.verbose
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrences per message id, for the duplicate summary in the report
static MESSAGE_COUNTS: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Current validation statistics
pub fn validation_stats() -> ValidationStats {
    VALIDATION_STATS.snapshot()
}

/// Print a colored summary of the validation messages seen so far
pub fn print_validation_stats_report() {
    let stats = validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Ok(guard) = MESSAGE_COUNTS.lock() {
        let repeated = guard
            .as_ref()
            .map_or(0, |counts| counts.values().filter(|&&count| count > 1).count());
        if repeated > 0 {
            println!("  {} message id(s) appeared more than once", repeated);
        }
    }
    println!("{}\n", "====================================".bright_blue().bold());
}

/// Create the messenger and reset the counters
pub(crate) fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    VALIDATION_STATS.reset();
    if let Ok(mut guard) = MESSAGE_COUNTS.lock() {
        *guard = Some(FxHashMap::default());
    }

    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }
        .map_err(|e| creation_error("Failed to create debug messenger", e))?;
    engine_debug!("toyvk::vulkan::validation", "Validation layer enabled");

    Ok((debug_utils, messenger))
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        std::borrow::Cow::Borrowed(fallback)
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id = c_str_or(callback_data.p_message_id_name, "Unknown");
    let message = c_str_or(callback_data.p_message, "No message");

    VALIDATION_STATS.record(message_severity);
    if let Ok(mut guard) = MESSAGE_COUNTS.lock() {
        if let Some(counts) = guard.as_mut() {
            *counts.entry(message_id.to_string()).or_insert(0) += 1;
        }
    }

    let source = "toyvk::vulkan::validation";
    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        engine_error!(source, "[{:?}] {}: {}", message_type, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        engine_warn!(source, "[{:?}] {}: {}", message_type, message_id, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        engine_info!(source, "[{:?}] {}: {}", message_type, message_id, message);
    } else {
        engine_debug!(source, "[{:?}] {}: {}", message_type, message_id, message);
    }

    vk::FALSE
}
