use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use clipsort::app::App;
use clipsort::config::{ConfigLoader, ConfigOverrides};
use clipsort::error::ClipsortError;
use clipsort::output::{ConsoleOutput, JsonOutput, OutputMode};
use clipsort::pacing::ThreadPacer;

/// Exit status when the run finished but a failure file is left behind.
const EXIT_RESIDUAL_FAILURES: u8 = 4;

#[derive(Parser)]
#[command(name = "clipsort")]
#[command(about = "Download labelled video clips from a CSV dataset into per-label folders")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone)]
struct SettingsArgs {
    /// JSON config file (defaults to ./clipsort.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// CSV dataset with id, url and label columns
    #[arg(long, global = true)]
    dataset: Option<String>,

    /// Root folder for the per-label directories
    #[arg(long, global = true)]
    output_dir: Option<String>,

    /// Netscape cookie file handed to yt-dlp
    #[arg(long, global = true)]
    cookies: Option<String>,

    /// Where failed ids are recorded between runs
    #[arg(long, global = true)]
    failure_file: Option<String>,

    #[arg(long, global = true)]
    batch_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download every job, then retry failures once (default)")]
    Run,
    #[command(about = "Download every job in paced batches and record failures")]
    Fetch(FetchArgs),
    #[command(about = "Retry the ids listed in the failure file")]
    Retry,
}

#[derive(Args, Clone)]
struct FetchArgs {
    /// Show where each job would go without downloading anything
    #[arg(long)]
    dry_run: bool,
}

enum Completion {
    Clean,
    ResidualFailures,
}

fn main() -> ExitCode {
    match run() {
        Ok(Completion::Clean) => ExitCode::SUCCESS,
        Ok(Completion::ResidualFailures) => ExitCode::from(EXIT_RESIDUAL_FAILURES),
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<ClipsortError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &ClipsortError) -> u8 {
    match error {
        ClipsortError::ConfigRead(_)
        | ClipsortError::ConfigParse(_)
        | ClipsortError::InvalidConfig(_)
        | ClipsortError::DatasetRead(_)
        | ClipsortError::Schema { .. } => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<Completion> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let SettingsArgs {
        config,
        dataset,
        output_dir,
        cookies,
        failure_file,
        batch_size,
    } = cli.settings;
    let overrides = ConfigOverrides {
        dataset,
        output_dir,
        cookies,
        failure_file,
        batch_size,
    };
    let resolved = ConfigLoader::resolve(config.as_deref(), overrides)?;
    let app = App::from_config(resolved)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_all(&app, output_mode),
        Commands::Fetch(args) if args.dry_run => run_plan(&app, output_mode),
        Commands::Fetch(_) => run_fetch(&app, output_mode),
        Commands::Retry => run_retry(&app, output_mode),
    }
}

fn run_all(
    app: &App<ThreadPacer>,
    output_mode: OutputMode,
) -> miette::Result<Completion> {
    let result = match output_mode {
        OutputMode::NonInteractive => {
            let result = app.run(&JsonOutput)?;
            JsonOutput::print_run(&result).into_diagnostic()?;
            result
        }
        OutputMode::Interactive => {
            let result = app.run(&ConsoleOutput)?;
            ConsoleOutput::print_run(&result);
            result
        }
    };
    Ok(completion(result.has_residual_failures()))
}

fn run_fetch(
    app: &App<ThreadPacer>,
    output_mode: OutputMode,
) -> miette::Result<Completion> {
    let result = match output_mode {
        OutputMode::NonInteractive => {
            let result = app.fetch(&JsonOutput)?;
            JsonOutput::print_fetch(&result).into_diagnostic()?;
            result
        }
        OutputMode::Interactive => {
            let result = app.fetch(&ConsoleOutput)?;
            ConsoleOutput::print_fetch(&result);
            result
        }
    };
    Ok(completion(result.has_residual_failures()))
}

fn run_retry(
    app: &App<ThreadPacer>,
    output_mode: OutputMode,
) -> miette::Result<Completion> {
    let result = match output_mode {
        OutputMode::NonInteractive => {
            let result = app.retry(&JsonOutput)?;
            JsonOutput::print_retry(&result).into_diagnostic()?;
            result
        }
        OutputMode::Interactive => {
            let result = app.retry(&ConsoleOutput)?;
            ConsoleOutput::print_retry(&result);
            result
        }
    };
    Ok(completion(result.has_residual_failures()))
}

fn run_plan(
    app: &App<ThreadPacer>,
    output_mode: OutputMode,
) -> miette::Result<Completion> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.plan(&JsonOutput)?;
            JsonOutput::print_plan(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.plan(&ConsoleOutput)?;
            ConsoleOutput::print_plan(&result);
        }
    }
    Ok(Completion::Clean)
}

fn completion(residual_failures: bool) -> Completion {
    if residual_failures {
        Completion::ResidualFailures
    } else {
        Completion::Clean
    }
}
