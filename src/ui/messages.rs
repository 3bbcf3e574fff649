use std::fmt;
use unicode_width::UnicodeWidthStr;

/// ANSI colors
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

const FG_BLUE: &str = "\x1b[34m";
const FG_GREEN: &str = "\x1b[32m";
const FG_YELLOW: &str = "\x1b[33m";
const FG_RED: &str = "\x1b[31m";

/// Icons
const ICON_INFO: &str = "ℹ️";
const ICON_OK: &str = "✅";
const ICON_WARN: &str = "⚠️";
const ICON_ERR: &str = "❌";
const ICON_LOCK: &str = "🔒";

pub fn info<T: fmt::Display>(msg: T) {
    println!("{}{}{} {}{}", FG_BLUE, BOLD, ICON_INFO, RESET, msg);
}

pub fn success<T: fmt::Display>(msg: T) {
    println!("{}{}{} {}{}", FG_GREEN, BOLD, ICON_OK, RESET, msg);
}

pub fn warning<T: fmt::Display>(msg: T) {
    println!("{}{}{} {}{}", FG_YELLOW, BOLD, ICON_WARN, RESET, msg);
}

pub fn error<T: fmt::Display>(msg: T) {
    eprintln!("{}{}{} {}{}", FG_RED, BOLD, ICON_ERR, RESET, msg);
}

/// Formatted section header
pub fn header<T: fmt::Display>(msg: T) {
    println!(
        "{}{}====================== {}\n{}",
        FG_BLUE, BOLD, msg, RESET
    );
}

/// Framed alert that the user must see before anything else happens
/// (the terminal counterpart of a modal dialog).
pub fn blocking_notice(title: &str, body: &str) {
    let width = UnicodeWidthStr::width(title)
        .max(UnicodeWidthStr::width(body))
        + 4;
    let bar = "─".repeat(width);

    println!("{}{}┌{}┐{}", FG_RED, BOLD, bar, RESET);
    for line in [format!("{} {}", ICON_LOCK, title), body.to_string()] {
        let pad = width.saturating_sub(UnicodeWidthStr::width(line.as_str()) + 2);
        println!(
            "{}{}│{} {}{} {}{}│{}",
            FG_RED,
            BOLD,
            RESET,
            line,
            " ".repeat(pad),
            FG_RED,
            BOLD,
            RESET
        );
    }
    println!("{}{}└{}┘{}", FG_RED, BOLD, bar, RESET);
}
