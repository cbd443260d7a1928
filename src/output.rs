//! CLI output formatting for all build stages.
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects. Warnings go to stderr via
//! [`warn`] so they survive piping the build log.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Posts
//! 001 Hello World (2024-06-01)
//!     Source: hello-world.md
//! ```
//!
//! ## Images
//!
//! ```text
//! hello-world
//!     sunrise.jpg: optimized
//!     diagram.svg: copied
//! Optimized 1, copied 1, fresh 0, failed 0
//! ```
//!
//! ## Pages
//!
//! ```text
//! Home → index.html
//! 001 Hello World → posts/hello-world/index.html
//! Generated 2 pages
//! ```

use crate::optimize::{OptimizeReport, Outcome};
use crate::post::Post;
use crate::render::RenderReport;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{pos:0>3}")
}

/// Log a non-fatal problem to stderr.
pub fn warn(message: &str) {
    eprintln!("warning: {message}");
}

// ============================================================================
// Scan
// ============================================================================

pub fn format_scan(posts: &[Post]) -> Vec<String> {
    let mut lines = vec!["Posts".to_string()];
    if posts.is_empty() {
        lines.push("    (none)".to_string());
        return lines;
    }
    for (i, post) in posts.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            post.title,
            post.date
        ));
        lines.push(format!("    Source: {}.md", post.slug));
    }
    lines
}

pub fn print_scan(posts: &[Post]) {
    for line in format_scan(posts) {
        println!("{line}");
    }
}

// ============================================================================
// Images
// ============================================================================

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Optimized => "optimized",
        Outcome::Copied => "copied",
        Outcome::Fallback => "copied (optimization failed)",
        Outcome::Skipped => "fresh",
        Outcome::Failed => "FAILED",
    }
}

pub fn format_optimize(report: &OptimizeReport) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_slug: Option<&str> = None;
    for entry in &report.entries {
        if current_slug != Some(entry.slug.as_str()) {
            lines.push(entry.slug.clone());
            current_slug = Some(&entry.slug);
        }
        lines.push(format!(
            "    {}: {}",
            entry.file,
            outcome_label(entry.outcome)
        ));
    }
    lines.push(format!(
        "Optimized {}, copied {}, fresh {}, failed {}",
        report.count(Outcome::Optimized),
        report.count(Outcome::Copied) + report.count(Outcome::Fallback),
        report.count(Outcome::Skipped),
        report.count(Outcome::Failed),
    ));
    lines
}

pub fn print_optimize(report: &OptimizeReport) {
    for line in format_optimize(report) {
        println!("{line}");
    }
}

// ============================================================================
// Pages
// ============================================================================

pub fn format_pages(report: &RenderReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, page) in report.pages.iter().enumerate() {
        if page.path == "index.html" {
            lines.push(format!("Home → {}", page.path));
        } else {
            lines.push(format!("{} {} → {}", format_index(i), page.title, page.path));
        }
    }
    lines.push(format!("Generated {} pages", report.pages.len()));
    lines
}

pub fn print_pages(report: &RenderReport) {
    for line in format_pages(report) {
        println!("{line}");
    }
}
