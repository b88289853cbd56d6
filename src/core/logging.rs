/// Per-engine log gate over `tracing`.
///
/// Every engine carries its own verbosity; nothing here is global. A message
/// above the configured level is never formatted.

use std::fmt;

use crate::schema::options::LogLevel;

#[derive(Debug, Clone, Copy, Default)]
pub struct Logger {
    level: LogLevel,
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::None && level <= self.level
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        if self.enabled(LogLevel::Errors) {
            tracing::error!("{}", args);
        }
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        if self.enabled(LogLevel::Warnings) {
            tracing::warn!("{}", args);
        }
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        if self.enabled(LogLevel::Info) {
            tracing::info!("{}", args);
        }
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        if self.enabled(LogLevel::Verbose) {
            tracing::trace!("{}", args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_cumulative() {
        let log = Logger::new(LogLevel::Warnings);
        assert!(log.enabled(LogLevel::Errors));
        assert!(log.enabled(LogLevel::Warnings));
        assert!(!log.enabled(LogLevel::Info));
        assert!(!log.enabled(LogLevel::Verbose));
    }

    #[test]
    fn none_silences_everything() {
        let log = Logger::new(LogLevel::None);
        assert!(!log.enabled(LogLevel::Errors));
        assert!(!log.enabled(LogLevel::None));
    }

    #[test]
    fn default_logs_errors_only() {
        let log = Logger::default();
        assert_eq!(log.level(), LogLevel::Errors);
        assert!(log.enabled(LogLevel::Errors));
        assert!(!log.enabled(LogLevel::Warnings));
    }
}
