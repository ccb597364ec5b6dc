//! Console sinks for live log mirroring

use crate::core::{LogLevel, Value};
#[cfg(feature = "console")]
use colored::Colorize;

/// A leveled console
///
/// `write` receives `Some(level)` when the console has a writer for that
/// level and `None` when the logger falls back to the generic writer.
pub trait ConsoleSink: Send + Sync {
    /// Whether this console has a dedicated writer for `level`
    fn supports(&self, _level: LogLevel) -> bool {
        true
    }

    fn write(&self, level: Option<LogLevel>, args: &[Value]);
}

/// Writes to stdout, or stderr for warnings and errors
pub struct StdConsole {
    #[cfg_attr(not(feature = "console"), allow(dead_code))]
    use_colors: bool,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            use_colors: cfg!(feature = "console"),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn format_line(&self, level: Option<LogLevel>, args: &[Value]) -> String {
        let message = args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        match level {
            Some(level) => format!("[{}] {}", self.level_tag(level), message),
            None => message,
        }
    }

    #[cfg(feature = "console")]
    fn level_tag(&self, level: LogLevel) -> String {
        let tag = format!("{:5}", level.to_str());
        if self.use_colors {
            tag.color(level.color_code()).to_string()
        } else {
            tag
        }
    }

    #[cfg(not(feature = "console"))]
    fn level_tag(&self, level: LogLevel) -> String {
        format!("{:5}", level.to_str())
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSink for StdConsole {
    fn write(&self, level: Option<LogLevel>, args: &[Value]) {
        let line = self.format_line(level, args);
        match level {
            Some(LogLevel::Warn | LogLevel::Error) => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line() {
        let console = StdConsole::with_colors(false);
        let line = console.format_line(
            Some(LogLevel::Info),
            &[Value::from("hello"), Value::object([("foo", Value::from("bar"))])],
        );
        assert_eq!(line, "[INFO ] hello { foo: \"bar\" }");
    }

    #[test]
    fn test_generic_writer_has_no_level_tag() {
        let console = StdConsole::with_colors(false);
        assert_eq!(console.format_line(None, &[Value::from(42)]), "42");
    }
}
