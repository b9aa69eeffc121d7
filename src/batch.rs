use std::time::Instant;

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::dispatch::{Dispatcher, JobOutcome};
use crate::domain::{Job, JobId};
use crate::pacing::{Pacer, PacingPolicy, Pause};

/// Outcome of one pass over a set of jobs. Ids keep processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub succeeded: Vec<JobId>,
    pub failed: Vec<JobId>,
    pub skipped: Vec<JobId>,
    pub batches: usize,
}

impl RunReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, job: &Job, outcome: &JobOutcome) {
        let bucket = match outcome {
            JobOutcome::Downloaded { .. } => &mut self.succeeded,
            JobOutcome::Skipped { .. } => &mut self.skipped,
            JobOutcome::Failed { .. } => &mut self.failed,
        };
        bucket.push(job.id.clone());
    }
}

/// Consecutive groups of at most `batch_size` jobs.
pub fn partition(jobs: &[Job], batch_size: usize) -> std::slice::Chunks<'_, Job> {
    jobs.chunks(batch_size.max(1))
}

pub struct BatchRunner<'a, P: Pacer> {
    dispatcher: &'a Dispatcher,
    pacer: &'a P,
    policy: PacingPolicy,
}

impl<'a, P: Pacer> BatchRunner<'a, P> {
    pub fn new(dispatcher: &'a Dispatcher, pacer: &'a P, policy: PacingPolicy) -> Self {
        Self {
            dispatcher,
            pacer,
            policy,
        }
    }

    /// Runs every job, `batch_size` at a time, pausing after each job and between batches.
    pub fn run_batches(
        &self,
        jobs: &[Job],
        batch_size: usize,
        sink: &dyn ProgressSink,
    ) -> RunReport {
        let mut report = RunReport::default();
        let total = jobs.len().div_ceil(batch_size.max(1));

        for (index, batch) in partition(jobs, batch_size).enumerate() {
            if index > 0 {
                self.pacer
                    .pause(Pause::BetweenBatches, self.policy.batch_delay);
            }
            let number = index + 1;
            tracing::info!(batch = number, total, jobs = batch.len(), "starting batch");
            sink.event(ProgressEvent::message(format!(
                "batch {number}/{total}: {} job(s)",
                batch.len()
            )));

            for job in batch {
                self.run_job(job, &mut report, "FAILED", sink);
            }
            report.batches += 1;

            sink.event(ProgressEvent::message(format!(
                "batch {number}/{total} done: {} ok, {} failed, {} skipped so far",
                report.succeeded.len(),
                report.failed.len(),
                report.skipped.len()
            )));
        }
        report
    }

    /// One unbatched pass, used for retries.
    pub fn run_pass(&self, jobs: &[Job], sink: &dyn ProgressSink) -> RunReport {
        let mut report = RunReport::default();
        for job in jobs {
            self.run_job(job, &mut report, "RETRY-FAILED", sink);
        }
        if !jobs.is_empty() {
            report.batches = 1;
        }
        report
    }

    fn run_job(
        &self,
        job: &Job,
        report: &mut RunReport,
        failure_tag: &str,
        sink: &dyn ProgressSink,
    ) {
        let start = Instant::now();
        let outcome = self.dispatcher.dispatch(job);
        match &outcome {
            JobOutcome::Downloaded { path, .. } => {
                sink.event(ProgressEvent {
                    message: format!("[OK] {} -> {path}", job.id),
                    elapsed: Some(start.elapsed()),
                });
            }
            JobOutcome::Skipped { reason } => {
                sink.event(ProgressEvent::message(format!("[SKIP] {} - {reason}", job.id)));
            }
            JobOutcome::Failed { error, .. } => {
                sink.event(ProgressEvent::message(format!(
                    "[{failure_tag}] {}: {error}",
                    job.id
                )));
            }
        }
        report.record(job, &outcome);
        self.pacer.pause(Pause::AfterJob, self.policy.job_delay);
    }
}
