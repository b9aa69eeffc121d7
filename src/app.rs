use std::time::Duration;

use serde::Serialize;

use crate::batch::{BatchRunner, RunReport};
use crate::config::ResolvedConfig;
use crate::dataset::{self, Dataset, RejectedRow};
use crate::dispatch::{Dispatcher, Route, RoutePlan};
use crate::drive::DriveHttpClient;
use crate::error::ClipsortError;
use crate::failures::FailureFile;
use crate::pacing::{Pacer, ThreadPacer};
use crate::platform::{YtDlpClient, YtDlpOptions};
use crate::retry::{RetryOutcome, RetryRunner};
use crate::store::OutputLayout;

pub const PLATFORM_ROUTE: &str = "yt-dlp";
pub const GENERIC_ROUTE: &str = "drive";

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub dataset: String,
    pub total_jobs: usize,
    /// Rows left out because their id or label is unusable.
    pub rejected: Vec<RejectedRow>,
    pub label_dirs: Vec<String>,
    pub report: RunReport,
    /// Set when failures were written for a later retry.
    pub failure_file: Option<String>,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryResult {
    /// False when there was no failure file to retry from.
    pub ran: bool,
    pub outcome: Option<RetryOutcome>,
    pub failure_file: Option<String>,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub fetch: FetchResult,
    pub retry: RetryResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub dataset: String,
    pub jobs: Vec<RoutePlan>,
    pub rejected: Vec<RejectedRow>,
}

impl FetchResult {
    pub fn has_residual_failures(&self) -> bool {
        self.failure_file.is_some()
    }
}

impl RetryResult {
    pub fn has_residual_failures(&self) -> bool {
        self.failure_file.is_some()
    }
}

impl RunResult {
    pub fn has_residual_failures(&self) -> bool {
        if self.retry.ran {
            self.retry.has_residual_failures()
        } else {
            self.fetch.has_residual_failures()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<P: Pacer> {
    config: ResolvedConfig,
    dispatcher: Dispatcher,
    failures: FailureFile,
    pacer: P,
}

impl App<ThreadPacer> {
    /// Wires the yt-dlp and Drive adapters from `config`, with real sleeps between jobs.
    pub fn from_config(config: ResolvedConfig) -> Result<Self, ClipsortError> {
        let ytdlp = YtDlpClient::new(
            config.platform.ytdlp_path.as_deref(),
            YtDlpOptions::from_settings(&config.platform, config.cookies.clone()),
        );
        if !ytdlp.is_available() {
            tracing::warn!("yt-dlp not found; platform jobs will be recorded as failures");
        }
        let drive = DriveHttpClient::new()?;

        let dispatcher = Dispatcher::new(OutputLayout::new(config.output_dir.clone()))
            .with_route(Route::new(PLATFORM_ROUTE, &config.platform_hosts, ytdlp))
            .with_route(Route::new(GENERIC_ROUTE, &config.generic_hosts, drive));
        Ok(Self::new(config, dispatcher, ThreadPacer))
    }
}

impl<P: Pacer> App<P> {
    pub fn new(config: ResolvedConfig, dispatcher: Dispatcher, pacer: P) -> Self {
        let failures = FailureFile::new(config.failure_file.clone());
        Self {
            config,
            dispatcher,
            failures,
            pacer,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    /// Loads the dataset and creates one output directory per label of the accepted rows.
    pub fn load_jobs(&self) -> Result<(Dataset, Vec<String>), ClipsortError> {
        let dataset = dataset::load(&self.config.dataset, &self.config.columns)?;
        let dirs = self
            .dispatcher
            .layout()
            .ensure_label_dirs(&dataset.jobs)?
            .into_iter()
            .map(|dir| dir.to_string())
            .collect();
        Ok((dataset, dirs))
    }

    pub fn fetch(&self, sink: &dyn ProgressSink) -> Result<FetchResult, ClipsortError> {
        sink.event(ProgressEvent::message(format!(
            "loading dataset {}",
            self.config.dataset
        )));
        let (Dataset { jobs, rejected }, label_dirs) = self.load_jobs()?;
        report_rejected(&rejected, sink);
        sink.event(ProgressEvent::message(format!(
            "{} job(s), {} label folder(s) under {}",
            jobs.len(),
            label_dirs.len(),
            self.dispatcher.layout().root()
        )));

        let runner = self.runner();
        let report = runner.run_batches(&jobs, self.config.batch_size, sink);

        let failure_file = if report.is_clean() {
            self.failures.clear()?;
            sink.event(ProgressEvent::message("all jobs completed without failures"));
            None
        } else {
            self.failures.save(&report.failed)?;
            sink.event(ProgressEvent::message(format!(
                "{} failed id(s) written to {}",
                report.failed.len(),
                self.failures.path()
            )));
            Some(self.failures.path().to_string())
        };

        Ok(FetchResult {
            dataset: self.config.dataset.to_string(),
            total_jobs: jobs.len(),
            rejected,
            label_dirs,
            report,
            failure_file,
            finished_at: iso_timestamp(),
        })
    }

    pub fn retry(&self, sink: &dyn ProgressSink) -> Result<RetryResult, ClipsortError> {
        if !self.failures.exists() {
            sink.event(ProgressEvent::message(format!(
                "no failure file at {}; nothing to retry",
                self.failures.path()
            )));
            return Ok(RetryResult {
                ran: false,
                outcome: None,
                failure_file: None,
                finished_at: iso_timestamp(),
            });
        }

        let (dataset, _) = self.load_jobs()?;
        let runner = self.runner();
        let outcome = RetryRunner::new(&self.failures).run(&dataset.jobs, &runner, sink)?;

        let failure_file = self
            .failures
            .exists()
            .then(|| self.failures.path().to_string());
        if let Some(outcome) = &outcome {
            for id in &outcome.unmatched {
                sink.event(ProgressEvent::message(format!(
                    "[SKIP] {id} - not found in dataset"
                )));
            }
            match &failure_file {
                Some(path) => sink.event(ProgressEvent::message(format!(
                    "{} id(s) still failing, kept in {path}",
                    outcome.report.failed.len()
                ))),
                None => sink.event(ProgressEvent::message(
                    "retry recovered every failed job; failure file removed",
                )),
            }
        }

        Ok(RetryResult {
            ran: outcome.is_some(),
            outcome,
            failure_file,
            finished_at: iso_timestamp(),
        })
    }

    /// First pass over the dataset followed by one retry pass when anything failed.
    pub fn run(&self, sink: &dyn ProgressSink) -> Result<RunResult, ClipsortError> {
        let fetch = self.fetch(sink)?;
        let retry = self.retry(sink)?;
        Ok(RunResult { fetch, retry })
    }

    /// Routes every job without downloading, sleeping or creating directories.
    pub fn plan(&self, sink: &dyn ProgressSink) -> Result<PlanResult, ClipsortError> {
        let Dataset { jobs, rejected } = dataset::load(&self.config.dataset, &self.config.columns)?;
        report_rejected(&rejected, sink);
        let plans = jobs
            .iter()
            .map(|job| self.dispatcher.plan(job))
            .collect::<Vec<_>>();
        for plan in &plans {
            let message = match plan.adapter {
                Some(adapter) => format!("[PLAN] {} via {adapter} -> {}", plan.id, plan.destination),
                None => format!("[SKIP] {} - unrecognized url: {}", plan.id, plan.url),
            };
            sink.event(ProgressEvent::message(message));
        }
        Ok(PlanResult {
            dataset: self.config.dataset.to_string(),
            jobs: plans,
            rejected,
        })
    }

    fn runner(&self) -> BatchRunner<'_, P> {
        BatchRunner::new(&self.dispatcher, &self.pacer, self.config.pacing)
    }
}

fn report_rejected(rejected: &[RejectedRow], sink: &dyn ProgressSink) {
    for row in rejected {
        sink.event(ProgressEvent::message(format!(
            "[SKIP] row {} - {}",
            row.row, row.reason
        )));
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
