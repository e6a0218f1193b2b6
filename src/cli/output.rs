//! CLI output formatting utilities.

use crate::pipeline::{AuditStatus, ComplianceIssue, Severity};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print the audit verdict banner.
    pub fn status(status: AuditStatus) {
        let label = match status {
            AuditStatus::Pass => style(" PASS ").black().on_green().bold(),
            AuditStatus::Fail => style(" FAIL ").white().on_red().bold(),
        };
        println!("\n  {}", label);
    }

    /// Print one compliance finding.
    pub fn finding(issue: &ComplianceIssue) {
        let severity = match issue.severity {
            Severity::Critical => style(issue.severity.to_string()).red().bold(),
            Severity::Warning => style(issue.severity.to_string()).yellow().bold(),
        };
        let at = issue
            .timestamp
            .as_deref()
            .map(|t| format!(" @ {}", t))
            .unwrap_or_default();
        println!(
            "  {} [{}] {}{}",
            style("*").cyan(),
            severity,
            style(&issue.category).bold(),
            style(at).dim()
        );
        if !issue.description.is_empty() {
            println!("    {}", content_preview(&issue.description, 300));
        }
    }

    /// Print an indexed policy source.
    pub fn source_info(source: &str, chunks: u32, indexed_at: &str) {
        println!(
            "  {} {} ({} chunks, indexed {})",
            style("*").cyan(),
            style(source).bold(),
            chunks,
            style(indexed_at).dim()
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
