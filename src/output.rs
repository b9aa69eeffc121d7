use std::io::{self, Write};

use serde::Serialize;

use crate::app::{FetchResult, PlanResult, ProgressEvent, ProgressSink, RetryResult, RunResult};
use crate::batch::RunReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_retry(result: &RetryResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_plan(result: &PlanResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human-readable progress on stdout.
pub struct ConsoleOutput;

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

impl ConsoleOutput {
    pub fn print_fetch(result: &FetchResult) {
        println!("{CYAN}clipsort summary{RESET}");
        print_report(&result.report);
        if !result.rejected.is_empty() {
            println!("{YELLOW}rejected rows: {}{RESET}", result.rejected.len());
        }
        match &result.failure_file {
            Some(path) => println!("{YELLOW}failed ids saved to {path}; run `clipsort retry`{RESET}"),
            None => println!("{GREEN}every job downloaded or skipped{RESET}"),
        }
    }

    pub fn print_retry(result: &RetryResult) {
        println!("{CYAN}clipsort retry summary{RESET}");
        let Some(outcome) = &result.outcome else {
            println!("{GREEN}nothing to retry{RESET}");
            return;
        };
        println!("requested: {}", outcome.requested.len());
        if !outcome.unmatched.is_empty() {
            println!(
                "{YELLOW}not in dataset: {}{RESET}",
                outcome.unmatched.join(", ")
            );
        }
        print_report(&outcome.report);
        match &result.failure_file {
            Some(path) => println!("{RED}still failing, see {path}{RESET}"),
            None => println!("{GREEN}failure file cleared{RESET}"),
        }
    }

    pub fn print_run(result: &RunResult) {
        Self::print_fetch(&result.fetch);
        if result.retry.ran {
            Self::print_retry(&result.retry);
        }
    }

    pub fn print_plan(result: &PlanResult) {
        let routed = result.jobs.iter().filter(|job| job.adapter.is_some()).count();
        println!(
            "{CYAN}dry run:{RESET} {routed} of {} job(s) would be downloaded",
            result.jobs.len()
        );
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let color = if event.message.starts_with("[FAILED]")
            || event.message.starts_with("[RETRY-FAILED]")
        {
            RED
        } else if event.message.starts_with("[SKIP]") {
            YELLOW
        } else {
            ""
        };
        let reset = if color.is_empty() { "" } else { RESET };
        match event.elapsed {
            Some(elapsed) => println!(
                "{color}{} ({} ms){reset}",
                event.message,
                elapsed.as_millis()
            ),
            None => println!("{color}{}{reset}", event.message),
        }
    }
}

fn print_report(report: &RunReport) {
    println!("{GREEN}downloaded: {}{RESET}", report.succeeded.len());
    println!("{RED}failed: {}{RESET}", report.failed.len());
    println!("{YELLOW}skipped: {}{RESET}", report.skipped.len());
    println!("batches: {}", report.batches);
}
