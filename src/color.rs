#![allow(clippy::module_name_repetitions)]
//! ANSI color handling for CLI stderr output.
//!
//! Precedence: NO_COLOR kills color unconditionally, then the --color flag,
//! then ORDFORGE_COLOR, then TTY autodetection.

use clap::ValueEnum;
use once_cell::sync::OnceCell;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(ColorMode::Auto),
            "always" | "on" | "true" | "yes" => Some(ColorMode::Always),
            "never" | "off" | "false" | "no" => Some(ColorMode::Never),
            _ => None,
        }
    }

    fn enabled(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => is_tty,
        }
    }
}

static COLOR_MODE: OnceCell<ColorMode> = OnceCell::new();

/// Record the CLI --color choice; first caller wins.
pub fn set_color_mode(mode: ColorMode) {
    let _ = COLOR_MODE.set(mode);
}

pub fn color_enabled_stderr() -> bool {
    // Per https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    let is_tty = atty::is(atty::Stream::Stderr);
    let mode = COLOR_MODE.get().copied().or_else(|| {
        std::env::var("ORDFORGE_COLOR")
            .ok()
            .and_then(|v| ColorMode::parse(&v))
    });
    mode.unwrap_or(ColorMode::Auto).enabled(is_tty)
}

/// Wrap string with an ANSI code when enabled; otherwise return unchanged.
pub fn paint(enabled: bool, code: &str, s: &str) -> String {
    if enabled {
        format!("{code}{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

pub fn log_info_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[36;1m", msg));
}

pub fn log_warn_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[33m", msg));
}

pub fn log_error_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[31;1m", msg));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_aliases() {
        assert_eq!(ColorMode::parse("ALWAYS"), Some(ColorMode::Always));
        assert_eq!(ColorMode::parse("off"), Some(ColorMode::Never));
        assert_eq!(ColorMode::parse("auto"), Some(ColorMode::Auto));
        assert_eq!(ColorMode::parse("rainbow"), None);
    }

    #[test]
    fn test_paint_only_when_enabled() {
        assert_eq!(paint(false, "\x1b[31m", "x"), "x");
        assert_eq!(paint(true, "\x1b[31m", "x"), "\x1b[31mx\x1b[0m");
    }

    #[test]
    fn test_mode_enabled_matrix() {
        assert!(ColorMode::Always.enabled(false));
        assert!(!ColorMode::Never.enabled(true));
        assert!(ColorMode::Auto.enabled(true));
        assert!(!ColorMode::Auto.enabled(false));
    }
}
