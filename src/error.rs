use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ClipsortError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read dataset: {0}")]
    DatasetRead(String),

    #[error("dataset is missing required columns: {}", .missing.join(", "))]
    #[diagnostic(help("the dataset needs a header row naming the id, url and label columns"))]
    Schema { missing: Vec<String> },

    #[error("{kind} {value:?} cannot be used as a file or directory name")]
    InvalidPathComponent { kind: &'static str, value: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("Drive request failed: {0}")]
    DriveHttp(String),

    #[error("Drive returned status {status}: {message}")]
    DriveStatus { status: u16, message: String },

    #[error("Drive served a confirmation page instead of the file: {0}")]
    DriveInterstitial(String),

    #[error("platform download failed: {0}")]
    PlatformDownload(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),
}
