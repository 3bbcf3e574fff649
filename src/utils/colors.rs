/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Colour of a punch or request status shown in listings.
pub fn color_for_status(status: &str) -> &'static str {
    match status {
        "VALID" | "APPROVED" => GREEN,
        "FLAGGED" | "REJECTED" => RED,
        "ADJUSTED" | "PENDING" => YELLOW,
        "CANCELLED" => GREY,
        _ => RESET,
    }
}

/// Severity colour of an occurrence.
pub fn color_for_severity(level: i64) -> &'static str {
    match level {
        i64::MIN..=1 => GREEN,
        2 => YELLOW,
        _ => RED,
    }
}

pub fn paint(color: &str, value: &str) -> String {
    format!("{color}{value}{RESET}")
}

/// Grey placeholder for empty values.
pub fn colorize_optional(value: &str) -> String {
    if value.trim().is_empty() || value.trim() == "-" {
        format!("{GREY}-{RESET}")
    } else {
        value.to_string()
    }
}
