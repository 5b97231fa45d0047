//! Error types for the Toy Vk engine
//!
//! Every failure the renderer can hit falls in one of a handful of classes.
//! None of them is recoverable: errors are propagated with `?` up to a single
//! top-level handler (`Engine::fatal`) which logs and terminates.

use std::fmt;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No device, queue family, format or extension meets the requirements
    CapabilityNegotiation(String),

    /// Buffer, image, view, pipeline or shader module creation rejected
    ResourceCreation(String),

    /// Host or device allocation failure
    OutOfMemory(String),

    /// Fence wait, image acquire, queue submit or present failed
    Synchronization(String),

    /// Invalid configuration (zero sizes, too many frames in flight, ...)
    Configuration(String),

    /// Stale or unknown texture / surface key
    InvalidResource(String),

    /// Asset or shader file could not be read or decoded
    Io(String),
}

impl Error {
    /// Short class name used by the fatal handler
    pub fn kind(&self) -> &'static str {
        match self {
            Error::CapabilityNegotiation(_) => "capability negotiation",
            Error::ResourceCreation(_) => "resource creation",
            Error::OutOfMemory(_) => "out of memory",
            Error::Synchronization(_) => "synchronization",
            Error::Configuration(_) => "configuration",
            Error::InvalidResource(_) => "invalid resource",
            Error::Io(_) => "io",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CapabilityNegotiation(msg) => write!(f, "Capability negotiation failed: {}", msg),
            Error::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            Error::OutOfMemory(msg) => write!(f, "Out of memory: {}", msg),
            Error::Synchronization(msg) => write!(f, "Synchronization failed: {}", msg),
            Error::Configuration(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR (with file:line) and build the matching `Error` value
///
/// # Example
///
/// ```no_run
/// # use toy_vk_engine::engine_err;
/// let err = engine_err!("toyvk::memory", ResourceCreation, "Failed to create buffer: {}", 42);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $kind:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::toyvk::Error::$kind(message)
    }};
}

/// Log an ERROR and return `Err` from the enclosing function
///
/// # Example
///
/// ```no_run
/// # use toy_vk_engine::engine_bail;
/// # fn check(frames: u32) -> toy_vk_engine::toyvk::Result<()> {
/// if frames == 0 {
///     engine_bail!("toyvk::config", Configuration, "frames_in_flight must be at least 1");
/// }
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $kind:ident, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $kind, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
