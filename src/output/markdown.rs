//! Markdown run report generation
//!
//! This module generates a human-readable markdown report of a run,
//! including its outcome, per-section results and error counts.

use crate::crawler::RunReport;
use crate::output::{describe_job_status, describe_status, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report for a run
///
/// # Arguments
///
/// * `report` - The finished run
/// * `source` - Site label shown in the title
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_markdown_report(
    report: &RunReport,
    source: &str,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(report, source);

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Run report written to {}", output_path.display());
    Ok(())
}

/// Formats a run report as markdown
pub fn format_markdown_report(report: &RunReport, source: &str) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Crawl Report: {}\n\n", source));

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", report.finished_at.to_rfc3339()));
    let duration = (report.finished_at - report.started_at).num_seconds();
    md.push_str(&format!(
        "- **Duration**: {} seconds ({:.2} minutes)\n",
        duration,
        duration as f64 / 60.0
    ));
    md.push_str(&format!("- **Status**: {}\n\n", describe_status(&report.status)));

    // Totals
    md.push_str("## Totals\n\n");
    md.push_str(&format!(
        "- **Records Saved**: {}\n",
        report.totals.records_saved
    ));
    md.push_str(&format!(
        "- **Listing Pages Visited**: {}\n",
        report.totals.pages_visited
    ));
    md.push_str(&format!("- **Soft Errors**: {}\n", report.totals.soft_errors));
    md.push_str(&format!(
        "- **Fetch Errors**: {}\n\n",
        report.totals.transport_errors
    ));

    // Per-section breakdown
    if !report.jobs.is_empty() {
        md.push_str("## Sections\n\n");
        md.push_str("| Section | Pages | Records | Soft Errors | Fetch Errors | Outcome |\n");
        md.push_str("|---------|-------|---------|-------------|--------------|---------|\n");

        for job in &report.jobs {
            let pages = match job.last_page {
                Some(last) => format!(
                    "{} (from {} of {})",
                    job.totals.pages_visited, job.start_page, last
                ),
                None => "-".to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                job.display_name,
                pages,
                job.totals.records_saved,
                job.totals.soft_errors,
                job.totals.transport_errors,
                describe_job_status(job.status)
            ));
        }
        md.push('\n');
    }

    md
}
