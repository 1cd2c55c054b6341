//! Output helpers for consistent CLI formatting
//!
//! Status lines go to stderr so stdout carries only content and data.

use console::style;

/// Report a completed step
pub fn step_ok(message: &str) {
    eprintln!("{} {}", style("[OK]").green(), message);
}

/// Report a completed step with dimmed detail
pub fn step_ok_detail(message: &str, detail: &str) {
    eprintln!("{} {} ({})", style("[OK]").green(), message, style(detail).dim());
}

/// Report neutral information
pub fn step_info(message: &str) {
    eprintln!("{} {}", style("[INFO]").cyan(), message);
}

/// Report a warning with a follow-up hint
pub fn step_warn_hint(message: &str, hint: &str) {
    eprintln!(
        "{} {} - {}",
        style("[WARN]").yellow(),
        message,
        style(hint).dim()
    );
}

/// Print a table header row and its rule
pub fn table_header(header: &str, width: usize) {
    println!("{}", style(header).bold());
    println!("{}", "-".repeat(width));
}
