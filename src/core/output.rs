//! Colored output and progress reporting
//!
//! Uses owo-colors for terminal colors and indicatif for progress bars.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const TICK_INTERVAL_MS: u64 = 80;
const BYTES_TEMPLATE: &str =
    "     {spinner:.cyan} [{bar:30.cyan/dim}] {bytes}/{total_bytes} ({eta})";

/// Print an action header (blue, bold)
/// Example: "==> Installing sharkdp/bat"
pub fn action(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// Print an action with package counter
/// Example: "(1/3) Upgrading sharkdp/bat"
pub fn action_numbered(current: usize, total: usize, message: &str) {
    println!(
        "{} {}",
        format!("({}/{})", current, total).cyan(),
        message.bold()
    );
}

/// Print a sub-action (cyan arrow)
/// Example: "  -> download"
pub fn sub_action(step: &str) {
    println!("  {} {}", "->".cyan(), step);
}

/// Print a detail line (dimmed)
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

/// Print a success message (green)
pub fn success(message: &str) {
    println!("{} {}", "==>".green().bold(), message.green());
}

/// Print an info message (cyan)
pub fn info(message: &str) {
    println!("{} {}", "::".cyan(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Print a skip message (dimmed)
/// Example: "==> /usr/local/bin/bat already gone, skipping"
pub fn skip(message: &str) {
    println!("{} {}", "==>".dimmed(), message.dimmed());
}

/// Echo a command before it runs (stderr, so stdout stays parseable)
pub fn command(dry_run: bool, cmd: &str) {
    let tag = if dry_run { "[dry-run]" } else { "[exec]" };
    eprintln!("{} {}", tag.dimmed(), cmd);
}

/// Print one row of the installed package table
pub fn package_row(repo_id: &str, version: &str, kind: &str, installed_at: &str) {
    println!(
        "  {:<32} {:<14} {:<7} {}",
        repo_id.cyan(),
        version.green(),
        kind.yellow(),
        installed_at.dimmed()
    );
}

/// Print the header of the installed package table
pub fn package_header() {
    println!(
        "  {:<32} {:<14} {:<7} {}",
        "PACKAGE".bold(),
        "VERSION".bold(),
        "TYPE".bold(),
        "INSTALLED AT".bold()
    );
}

/// Create a simple spinner for operations
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("     {spinner:.cyan} {msg}")
        .map(|s| s.tick_chars(SPINNER_CHARS))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(TICK_INTERVAL_MS));
    pb
}

/// Turn a spinner into a byte progress bar once the content length is known.
pub fn upgrade_to_bytes(pb: &ProgressBar, total_bytes: u64) {
    pb.set_length(total_bytes);
    let style = ProgressStyle::default_bar()
        .template(BYTES_TEMPLATE)
        .map(|s| s.progress_chars("━╸━"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
}

/// Finish a progress bar and clear it
pub fn progress_done(pb: ProgressBar) {
    pb.finish_and_clear();
}
