//! Output module for run reports and record statistics
//!
//! This module handles:
//! - Printing the end-of-run summary to the console
//! - Writing the markdown run report
//! - Summarising what the record database holds

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{load_statistics, print_statistics, RecordStatistics};

use crate::crawler::{JobStatus, RunReport, RunStatus};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Human-readable run outcome, e.g. for logs and the report header
pub fn describe_status(status: &RunStatus) -> String {
    match status {
        RunStatus::Completed => "completed".to_string(),
        RunStatus::Halted {
            job_id,
            page,
            reason,
        } => format!("halted in '{}' at page {} ({})", job_id, page, reason),
        RunStatus::Interrupted { job_id, page } => {
            format!("interrupted in '{}', resumes at page {}", job_id, page)
        }
        RunStatus::Unreachable => "network unreachable, nothing crawled".to_string(),
    }
}

pub(crate) fn describe_job_status(status: JobStatus) -> String {
    match status {
        JobStatus::Completed(reason) => reason.to_string(),
        JobStatus::Skipped => "skipped".to_string(),
        JobStatus::Halted => "halted".to_string(),
    }
}

/// Prints the end-of-run summary to stdout
pub fn print_run_report(report: &RunReport) {
    println!("=== Run Summary ===\n");
    println!("Status: {}", describe_status(&report.status));
    println!(
        "Duration: {}s",
        (report.finished_at - report.started_at).num_seconds()
    );
    println!();

    for job in &report.jobs {
        println!(
            "  {} [{}]: {} records, {} pages, {} soft errors, {} fetch errors",
            job.display_name,
            describe_job_status(job.status),
            job.totals.records_saved,
            job.totals.pages_visited,
            job.totals.soft_errors,
            job.totals.transport_errors
        );
    }
    println!();

    println!("Total records saved: {}", report.totals.records_saved);
    println!("Total soft errors: {}", report.totals.soft_errors);
    println!("Total fetch errors: {}", report.totals.transport_errors);

    match &report.status {
        RunStatus::Halted { job_id, page, .. } | RunStatus::Interrupted { job_id, page } => {
            println!();
            println!(
                "Progress saved at '{}' page {}. Run the same command again to continue.",
                job_id, page
            );
        }
        RunStatus::Completed | RunStatus::Unreachable => {}
    }
}
