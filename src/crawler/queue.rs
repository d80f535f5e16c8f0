//! Ordered task list for a run
//!
//! A run is a fixed sequence of tasks: an optional reachability check
//! followed by one crawl job per configured section. The queue applies the
//! resume checkpoint, runs the tasks in order, and clears the checkpoint
//! once every job has finished.

use crate::crawler::probe::ReachabilityProbe;
use crate::crawler::runner::{run_job, CrawlContext, HaltReason, Job, JobReport, JobTotals};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A unit of work in the run
#[derive(Clone)]
pub enum Task {
    /// Confirm the network path before crawling
    CheckReachability(Arc<dyn ReachabilityProbe>),
    /// Crawl one section
    Crawl(Job),
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every job ran; the checkpoint was cleared
    Completed,
    /// A fatal or storage failure stopped the run; resume from `job_id`/`page`
    Halted {
        job_id: String,
        page: u32,
        reason: String,
    },
    /// Cancelled from outside; the checkpoint holds the last flushed page
    Interrupted { job_id: String, page: u32 },
    /// The reachability check failed before any job ran
    Unreachable,
}

/// Summary of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub jobs: Vec<JobReport>,
    pub totals: JobTotals,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            status: RunStatus::Completed,
            jobs: Vec::new(),
            totals: JobTotals::default(),
            started_at: now,
            finished_at: now,
        }
    }

    fn push(&mut self, job: JobReport) {
        self.totals.merge(&job.totals);
        self.jobs.push(job);
    }

    fn finish(mut self, status: RunStatus) -> Self {
        self.status = status;
        self.finished_at = Utc::now();
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// FIFO of tasks for one run
#[derive(Clone, Default)]
pub struct JobQueue {
    tasks: Vec<Task>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job: Job) {
        self.tasks.push(Task::Crawl(job));
    }

    pub fn register_check(&mut self, probe: Arc<dyn ReachabilityProbe>) {
        self.tasks.push(Task::CheckReachability(probe));
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.tasks.iter().filter_map(|task| match task {
            Task::Crawl(job) => Some(job),
            Task::CheckReachability(_) => None,
        })
    }

    /// Applies a loaded checkpoint and returns the index of the first task
    /// whose job should run.
    ///
    /// The matching job starts at `next_page`; every job before it is
    /// skipped. An unknown job id (the section list changed) restarts the
    /// whole queue from page 1. Checks are never skipped.
    pub fn apply_resume(&mut self, job_id: Option<&str>, next_page: u32) -> usize {
        let Some(job_id) = job_id else {
            return 0;
        };

        let position = self.tasks.iter().position(|task| match task {
            Task::Crawl(job) => job.id() == job_id,
            Task::CheckReachability(_) => false,
        });

        match position {
            Some(index) => {
                if let Task::Crawl(job) = &mut self.tasks[index] {
                    tracing::info!(
                        "Resuming '{}' at page {}; earlier sections are skipped",
                        job.display_name,
                        next_page
                    );
                    job.start_page = next_page.max(1);
                }
                index
            }
            None => {
                tracing::warn!(
                    "Checkpoint names unknown section '{}', starting from the beginning",
                    job_id
                );
                0
            }
        }
    }

    /// Runs every task in order against `ctx`
    pub async fn run(mut self, ctx: &mut CrawlContext) -> RunReport {
        let (job_id, next_page) = ctx.checkpoints.load();
        let first = self.apply_resume(job_id.as_deref(), next_page);
        let mut report = RunReport::new();

        for (index, task) in self.tasks.iter().enumerate() {
            match task {
                Task::CheckReachability(probe) => {
                    if !probe.check().await {
                        tracing::error!("[!] Reachability check failed, no section was crawled");
                        return report.finish(RunStatus::Unreachable);
                    }
                }
                Task::Crawl(job) if index < first => {
                    tracing::debug!("Skipping '{}' (finished in an earlier run)", job.display_name);
                }
                Task::Crawl(job) => match run_job(ctx, job).await {
                    Ok(job_report) => {
                        report.push(job_report);
                        if let Some(next) = self.next_job_after(index) {
                            ctx.checkpoints.save(next.id(), 1);
                        }
                    }
                    Err(halt) => {
                        tracing::error!("[!] Run {}", halt);
                        report.push(halt.report);
                        let status = match halt.reason {
                            HaltReason::Interrupted => RunStatus::Interrupted {
                                job_id: halt.job_id,
                                page: halt.page,
                            },
                            reason => RunStatus::Halted {
                                job_id: halt.job_id,
                                page: halt.page,
                                reason: reason.to_string(),
                            },
                        };
                        return report.finish(status);
                    }
                },
            }
        }

        ctx.checkpoints.clear();
        tracing::info!("[+] All sections finished, checkpoint cleared");
        report.finish(RunStatus::Completed)
    }

    fn next_job_after(&self, index: usize) -> Option<&Job> {
        self.tasks[index + 1..].iter().find_map(|task| match task {
            Task::Crawl(job) => Some(job),
            Task::CheckReachability(_) => None,
        })
    }
}
