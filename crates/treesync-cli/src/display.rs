//! Display utilities for the treesync CLI

use console::style;
use std::time::Duration;
use treesync_sync::DiffSummary;
use treesync_types::ApplyReport;

/// Print the per-kind action counts of a plan
pub fn display_plan_summary(summary: &DiffSummary, delete_missing: bool) {
    println!();
    println!("{}", style("Planned Changes:").bold().underlined());
    println!("  Files to add: {}", style(summary.added).green());
    println!("  Files to modify: {}", style(summary.modified).yellow());
    if delete_missing {
        println!("  Files to delete: {}", style(summary.missing).red());
    } else {
        println!(
            "  Files missing from source: {} {}",
            style(summary.missing).dim(),
            style("(kept, pass --delete-missing to remove)").dim()
        );
    }
}

/// Print the outcome of an apply run
pub fn display_apply_report(report: &ApplyReport) {
    println!();
    println!("{}", style("Sync Statistics:").bold().underlined());
    println!("  Files copied: {}", style(report.copied).green());
    println!("  Files deleted: {}", style(report.deleted).green());
    println!("  Files kept: {}", style(report.skipped).yellow());
    println!(
        "  Bytes copied: {}",
        style(format_bytes(report.bytes_copied)).green()
    );
    println!(
        "  Errors: {}",
        if report.failed > 0 {
            style(report.failed).red()
        } else {
            style(report.failed).green()
        }
    );
    println!(
        "  Duration: {}",
        style(format_duration(report.duration)).blue()
    );
    println!(
        "  Transfer rate: {}",
        style(format!(
            "{:.2} MB/s",
            report.transfer_rate() / 1024.0 / 1024.0
        ))
        .blue()
    );
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
