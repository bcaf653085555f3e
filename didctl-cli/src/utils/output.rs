//! # Output Formatting
//!
//! Provides formatted output functions with colors, emojis, and consistent
//! styling for user-facing messages and terminal output.

use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Stream, Style};

/// Enum representing different color modes for output
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
  /// Enable colored output
  Yes,
  /// Enable colored output (alias for Yes)
  Always,
  /// Automatically detect if colors should be used based on terminal
  /// capabilities
  Auto,
  /// Disable colored output
  No,
  /// Disable colored output (alias for No)
  Never,
}

/// Helper function to safely get an emoji or fallback to a default character
pub fn get_emoji_or_default(name: &str, default: &str) -> String {
  match emojis::get_by_shortcode(name) {
    Some(emoji) => emoji.to_string(),
    None => default.to_string(),
  }
}

/// Apply `style` when `stream` supports color (or `--colors` forces it)
fn paint(text: &str, style: Style, stream: Stream) -> String {
  text.if_supports_color(stream, |text| text.style(style)).to_string()
}

/// Print a success message
pub fn print_success(message: &str) {
  let check = get_emoji_or_default("check_mark", "✓");
  println!("{} {}", paint(&check, Style::new().green().bold(), Stream::Stdout), message);
}

/// Print an error message
pub fn print_error(message: &str) {
  let cross = get_emoji_or_default("cross_mark", "✗");
  eprintln!("{} {}", paint(&cross, Style::new().red().bold(), Stream::Stderr), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
  let warning = get_emoji_or_default("warning", "⚠");
  println!("{} {}", paint(&warning, Style::new().yellow().bold(), Stream::Stdout), message);
}

/// Print an info message
pub fn print_info(message: &str) {
  let info = get_emoji_or_default("information", "ℹ");
  println!("{} {}", paint(&info, Style::new().blue().bold(), Stream::Stdout), message);
}

/// Print a section header
pub fn print_header(header: &str) {
  println!("\n{}", paint(header, Style::new().blue().bold(), Stream::Stdout));
}

/// Format a branch name
pub fn format_branch(name: &str) -> String {
  paint(name, Style::new().bright_cyan().bold(), Stream::Stdout)
}

/// Format a path inside the repository or on disk
pub fn format_path(path: &str) -> String {
  paint(path, Style::new().bright_green(), Stream::Stdout)
}

/// Abbreviated commit or blob id
pub fn short_sha(sha: &str) -> &str {
  sha.get(..7).unwrap_or(sha)
}

/// Format a commit or blob id, abbreviated
pub fn format_sha(sha: &str) -> String {
  paint(short_sha(sha), Style::new().yellow(), Stream::Stdout)
}

/// Format a timestamp
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
  timestamp.format("%Y-%m-%d %H:%M").to_string()
}

/// Format a command or command example
pub fn format_command(cmd: &str) -> String {
  paint(cmd, Style::new().purple(), Stream::Stdout)
}
