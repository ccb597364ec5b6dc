//! Logging macros for ergonomic argument lists.
//!
//! Logger methods take a list of [`Value`](crate::Value)s. These macros
//! convert each argument with `Value::from`, so mixed argument types can
//! be passed directly.
//!
//! # Examples
//!
//! ```
//! use client_telemetry::prelude::*;
//! use client_telemetry::info;
//!
//! let publisher = Publisher::builder().build().unwrap();
//! let logger = Logger::builder().sink(publisher.clone()).build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // Several arguments of different types
//! let port = 8080;
//! info!(logger, "Server listening", port, true);
//!
//! assert_eq!(publisher.buffer_len("logs"), 2);
//! ```

/// Record arguments at an explicit level.
///
/// # Examples
///
/// ```
/// # use client_telemetry::prelude::*;
/// # let publisher = Publisher::builder().build().unwrap();
/// # let logger = Logger::builder().sink(publisher).build().unwrap();
/// use client_telemetry::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Warn, "Status code", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:expr),+ $(,)?) => {
        $logger.emit($level, vec![$($crate::Value::from($arg)),+])
    };
}

/// Record a debug-level entry.
///
/// # Examples
///
/// ```
/// # use client_telemetry::prelude::*;
/// # let publisher = Publisher::builder().build().unwrap();
/// # let logger = Logger::builder().sink(publisher).build().unwrap();
/// use client_telemetry::debug;
/// debug!(logger, "Counter value", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $logger.debug(vec![$($crate::Value::from($arg)),+])
    };
}

/// Record an info-level entry.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $logger.info(vec![$($crate::Value::from($arg)),+])
    };
}

/// Record a warning-level entry.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $logger.warn(vec![$($crate::Value::from($arg)),+])
    };
}

/// Record an error.
///
/// Goes through [`Logger::error`](crate::Logger::error), so a leading
/// message is promoted to an error and acknowledged errors are skipped.
///
/// # Examples
///
/// ```
/// # use client_telemetry::prelude::*;
/// # let publisher = Publisher::builder().build().unwrap();
/// # let logger = Logger::builder().sink(publisher.clone()).build().unwrap();
/// use client_telemetry::error;
/// error!(logger, "Failed to connect to database");
///
/// let handled = ErrorValue::new("already reported").acknowledge();
/// error!(logger, "retrying", handled);
///
/// assert_eq!(publisher.buffer_len("logs"), 1);
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:expr),+ $(,)?) => {
        $logger.error(vec![$($crate::Value::from($arg)),+])
    };
}
