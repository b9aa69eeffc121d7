use std::collections::HashSet;

use serde::Serialize;

use crate::app::ProgressSink;
use crate::batch::{BatchRunner, RunReport};
use crate::domain::Job;
use crate::error::ClipsortError;
use crate::failures::FailureFile;
use crate::pacing::Pacer;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetryOutcome {
    /// Ids read from the failure file.
    pub requested: Vec<String>,
    /// Requested ids with no matching dataset row; dropped from the record.
    pub unmatched: Vec<String>,
    pub report: RunReport,
}

/// Splits `jobs` into the ones named in `ids`, keeping dataset order, and the ids nobody matched.
pub fn select_failed(jobs: &[Job], ids: &[String]) -> (Vec<Job>, Vec<String>) {
    let wanted = ids.iter().map(String::as_str).collect::<HashSet<_>>();
    let selected = jobs
        .iter()
        .filter(|job| wanted.contains(job.id.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    let found = selected
        .iter()
        .map(|job| job.id.as_str())
        .collect::<HashSet<_>>();
    let mut seen = HashSet::new();
    let unmatched = ids
        .iter()
        .filter(|id| !found.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect();
    (selected, unmatched)
}

pub struct RetryRunner<'a> {
    failures: &'a FailureFile,
}

impl<'a> RetryRunner<'a> {
    pub fn new(failures: &'a FailureFile) -> Self {
        Self { failures }
    }

    /// Re-runs the jobs listed in the failure file once. `None` when no failure file exists.
    ///
    /// Ids that fail again replace the record; a clean pass deletes it.
    pub fn run<P: Pacer>(
        &self,
        jobs: &[Job],
        runner: &BatchRunner<'_, P>,
        sink: &dyn ProgressSink,
    ) -> Result<Option<RetryOutcome>, ClipsortError> {
        let Some(requested) = self.failures.load()? else {
            return Ok(None);
        };

        let (selected, unmatched) = select_failed(jobs, &requested);
        if !unmatched.is_empty() {
            tracing::warn!(
                count = unmatched.len(),
                ids = %unmatched.join(","),
                "failed ids not present in dataset; dropping them"
            );
        }
        tracing::info!(jobs = selected.len(), "retrying failed jobs");

        let report = runner.run_pass(&selected, sink);
        self.failures.replace(&report.failed)?;

        Ok(Some(RetryOutcome {
            requested,
            unmatched,
            report,
        }))
    }
}
