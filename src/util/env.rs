//! Environment detection utilities.

use std::io::IsTerminal;

/// Width used when stdout is not a terminal.
pub const DEFAULT_WIDTH: usize = 80;

/// Check if stdout is a TTY.
#[must_use]
pub fn stdout_is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if stderr is a TTY.
#[must_use]
pub fn stderr_is_tty() -> bool {
    std::io::stderr().is_terminal()
}

/// Whether the flag and environment allow color at all.
#[must_use]
pub fn color_allowed(no_color_flag: bool) -> bool {
    if no_color_flag {
        return false;
    }

    // Check NO_COLOR environment variable
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    // Check TERM=dumb
    !std::env::var("TERM").is_ok_and(|t| t == "dumb")
}

/// Check if color should be enabled on stdout.
#[must_use]
pub fn should_use_color(no_color_flag: bool) -> bool {
    color_allowed(no_color_flag) && stdout_is_tty()
}

/// Check if color should be enabled for errors on stderr.
#[must_use]
pub fn should_color_errors(no_color_flag: bool) -> bool {
    color_allowed(no_color_flag) && stderr_is_tty()
}

/// Terminal width for rendering, or [`DEFAULT_WIDTH`] when piped.
#[must_use]
pub fn terminal_width() -> usize {
    if stdout_is_tty() {
        rich_rust::prelude::Console::new().width()
    } else {
        DEFAULT_WIDTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_disables_color() {
        assert!(!color_allowed(true));
        assert!(!should_use_color(true));
        assert!(!should_color_errors(true));
    }
}
