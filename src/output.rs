//! CLI output formatting for all pipeline stages.
//!
//! Every stage returns a report value; this module turns reports into
//! console lines. Each entity gets a header line (positional index plus its
//! identity) and indented context lines underneath:
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Templates
//! 001 digest.mjml → dist/digest.html
//! 002 src/welcome.mjml → dist/welcome.html
//!
//! 2 template(s)
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 src/welcome.mjml → dist/welcome.html
//!     Warning: Attribute foo is illegal
//! 002 src/broken.mjml
//!     Failed: compiler exited with exit status: 1: Malformed MJML
//!
//! Compiled 1/2 succeeded in 0.4s
//! ```
//!
//! ## Export
//!
//! ```text
//! outlook → exports/outlook
//! 001 dist/welcome.html
//!     welcome.oft
//!     welcome.emltpl
//!     welcome-outlook.html
//!     Rules: cell-classes, office-settings, vml-background
//!     README.md
//!
//! Exported 1/1 document(s), 4 file(s)
//! ```
//!
//! ## Archive
//!
//! ```text
//! Archives → exports/archives
//! 001 HTML mailpress-2024-05-01-html.tar.gz (2.1 KB)
//!     sha256: 9f86d0…
//!     Skipped: Outlook (nothing to bundle)
//! Manifest: exports/archives/mailpress-2024-05-01-manifest.json
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::archive::BundleReport;
use crate::compile::{BuildRun, Outcome};
use crate::config::ProjectConfig;
use crate::export::ExportReport;
use crate::naming;
use crate::watch::WatchEvent;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Discovered templates with the output path each would compile to.
pub fn format_check_output(sources: &[PathBuf], config: &ProjectConfig) -> Vec<String> {
    let mut lines = vec!["Templates".to_string()];
    for (i, source) in sources.iter().enumerate() {
        let output = naming::output_path(
            source,
            Path::new(&config.paths.source_root),
            Path::new(&config.paths.output),
        );
        lines.push(format!(
            "{} {} \u{2192} {}",
            format_index(i + 1),
            slash(source),
            slash(&output)
        ));
    }
    lines.push(String::new());
    lines.push(format!("{} template(s)", sources.len()));
    lines
}

pub fn print_check_output(sources: &[PathBuf], config: &ProjectConfig) {
    print_lines(format_check_output(sources, config));
}

// ============================================================================
// Build
// ============================================================================

/// One entry per compiled document, then the run summary.
///
/// Failed documents show no output path since nothing was written.
pub fn format_build_output(run: &BuildRun) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, doc) in run.documents.iter().enumerate() {
        let index = format_index(i + 1);
        match &doc.outcome {
            Outcome::Compiled { .. } => lines.push(format!(
                "{} {} \u{2192} {}",
                index,
                slash(&doc.source_path),
                slash(&doc.output_path)
            )),
            Outcome::Failed { .. } => lines.push(format!("{} {}", index, slash(&doc.source_path))),
        }
        for warning in &doc.warnings {
            lines.push(format!("{}Warning: {}", indent(1), warning));
        }
        if let Outcome::Failed { error } = &doc.outcome {
            lines.push(format!("{}Failed: {}", indent(1), error));
        }
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!("Compiled {} in {}", run, format_elapsed(run.elapsed)));
    lines
}

pub fn print_build_output(run: &BuildRun) {
    print_lines(format_build_output(run));
}

// ============================================================================
// Export
// ============================================================================

pub fn format_export_output(report: &ExportReport) -> Vec<String> {
    let mut lines = vec![format!("{} \u{2192} {}", report.client, slash(&report.directory))];
    for (i, doc) in report.documents.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), slash(&doc.source)));
        match &doc.error {
            Some(error) => lines.push(format!("{}Failed: {}", indent(1), error)),
            None => {
                for file in &doc.files {
                    lines.push(format!("{}{}", indent(1), file));
                }
                if !doc.applied.is_empty() {
                    lines.push(format!("{}Rules: {}", indent(1), doc.applied.join(", ")));
                }
            }
        }
    }
    for extra in &report.extras {
        lines.push(format!("{}{}", indent(1), extra));
    }
    lines.push(String::new());
    if report.total() == 0 {
        lines.push("Nothing to export; run a build first".to_string());
    } else {
        lines.push(format!(
            "Exported {}/{} document(s), {} file(s)",
            report.succeeded(),
            report.total(),
            report.files_written()
        ));
    }
    lines
}

pub fn print_export_output(report: &ExportReport) {
    print_lines(format_export_output(report));
}

// ============================================================================
// Archive
// ============================================================================

pub fn format_archive_output(report: &BundleReport) -> Vec<String> {
    let mut lines = vec![format!("Archives \u{2192} {}", slash(&report.directory))];
    for (i, entry) in report.manifest.archives.iter().enumerate() {
        lines.push(format!(
            "{} {} {} ({})",
            format_index(i + 1),
            entry.kind,
            entry.filename,
            format_size(entry.size)
        ));
        lines.push(format!("{}sha256: {}", indent(1), entry.sha256));
    }
    for kind in &report.skipped {
        lines.push(format!("{}Skipped: {} (nothing to bundle)", indent(1), kind.label()));
    }
    lines.push(format!("Manifest: {}", slash(&report.manifest_path)));
    lines
}

pub fn print_archive_output(report: &BundleReport) {
    print_lines(format_archive_output(report));
}

// ============================================================================
// Watch
// ============================================================================

/// Lines for one watch-mode progress event.
///
/// `root` is stripped from event paths so they read project-relative.
pub fn format_watch_event(event: &WatchEvent, root: &Path) -> Vec<String> {
    let rel = |path: &Path| slash(path.strip_prefix(root).unwrap_or(path));
    match event {
        WatchEvent::BuildStarted { trigger: None } => vec!["==> Building".to_string()],
        WatchEvent::BuildStarted {
            trigger: Some(path),
        } => vec![format!("==> Changed {}, rebuilding", rel(path))],
        WatchEvent::BuildFinished(run) => {
            let mut lines = format_build_output(run);
            lines.push("==> Waiting for changes".to_string());
            lines
        }
        WatchEvent::BuildFailed(error) => vec![format!("==> Build failed: {}", error)],
        WatchEvent::Dropped { path } => {
            vec![format!("{}Ignored {} (build in progress)", indent(1), rel(path))]
        }
        WatchEvent::Removed { path } => {
            vec![format!("==> Removed {} (compiled output kept)", rel(path))]
        }
        WatchEvent::WatcherError(error) => vec![format!("==> Watcher error: {}", error)],
    }
}
