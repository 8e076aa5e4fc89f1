use crate::raise_error::{apply_level, raise_error, Level};

/// Reports progress and results to stderr, filtered by a minimum level.
#[derive(Clone, Copy, Debug)]
pub struct Logger {
    threshold: Level,
    quiet: bool,
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new(false, Level::Completion)
    }
}

impl Logger {
    pub fn new(quiet: bool, threshold: Level) -> Logger {
        Logger { threshold, quiet }
    }

    /// A logger that only ever reports terminating errors.
    pub fn quiet() -> Logger {
        Logger::new(true, Level::Fatal)
    }

    /// Whether a message at `level` would be printed.
    pub fn enabled(&self, level: Level) -> bool {
        !self.quiet && level >= self.threshold
    }

    /// Prints the message if its level passes the threshold. Errors and fatal
    /// errors are always printed and end the process.
    pub fn log(&self, message: &str, level: Level) {
        if level.terminates() {
            raise_error(message, level);
            return;
        }
        if self.enabled(level) {
            eprintln!("{}", apply_level(message, level));
        }
    }

    pub fn info(&self, message: &str) {
        self.log(message, Level::Info);
    }

    pub fn completed(&self, message: &str) {
        self.log(message, Level::Completion);
    }

    pub fn warning(&self, message: &str) {
        self.log(message, Level::Warning);
    }

    /// Returns true unless the logger was built quiet.
    pub fn is_verbose(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_logger_filters_everything_below_fatal() {
        let logger = Logger::quiet();
        assert!(!logger.enabled(Level::Info));
        assert!(!logger.enabled(Level::Warning));
        assert!(!logger.is_verbose());
    }

    #[test]
    fn threshold_filters_lower_levels() {
        let logger = Logger::new(false, Level::Info);
        assert!(!logger.enabled(Level::Completion));
        assert!(logger.enabled(Level::Info));
        assert!(logger.enabled(Level::Warning));
    }
}
