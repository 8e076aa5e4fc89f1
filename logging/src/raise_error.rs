use colored::*;
use std::fmt;
use std::process::exit;

/// Severity of a reported message, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Completion = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    fn prefix(self) -> &'static str {
        match self {
            Level::Completion => "completed: ",
            Level::Info => "info: ",
            Level::Warning => "warning: ",
            Level::Error => "error: ",
            Level::Fatal => "fatal error: ",
        }
    }

    /// Errors and fatal errors end the run.
    pub fn terminates(self) -> bool {
        self > Level::Warning
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches(": "))
    }
}

pub(crate) fn apply_level(string: &str, level: Level) -> ColoredString {
    let text = level.prefix().to_owned() + string;
    match level {
        Level::Completion => text.bright_green(),
        Level::Info => text.bright_cyan(),
        Level::Warning => text.bright_yellow(),
        Level::Error => text.bright_red(),
        Level::Fatal => text.red().bold(),
    }
}

/// Prints the message to stderr and exits with status 1 for errors and fatal errors.
///
/// # Arguments
///
/// * `error` - The message to report
/// * `level` - The severity; anything above `Level::Warning` terminates the process
pub fn raise_error(error: &str, level: Level) {
    eprintln!("{}", apply_level(error, level));
    if level.terminates() {
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(Level::Completion < Level::Info);
        assert!(Level::Warning < Level::Error);
        assert!(!Level::Warning.terminates());
        assert!(Level::Error.terminates());
        assert!(Level::Fatal.terminates());
    }

    #[test]
    fn applied_level_carries_prefix() {
        colored::control::set_override(false);
        assert_eq!(apply_level("x", Level::Info).to_string(), "info: x");
        assert_eq!(apply_level("x", Level::Fatal).to_string(), "fatal error: x");
        assert_eq!(Level::Completion.to_string(), "completed");
    }
}
