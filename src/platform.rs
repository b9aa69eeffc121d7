use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::PlatformSettings;
use crate::dispatch::Downloader;
use crate::domain::OUTPUT_EXTENSION;
use crate::error::ClipsortError;

/// Social-video downloader backed by the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlpClient {
    program: Option<PathBuf>,
    options: YtDlpOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YtDlpOptions {
    pub format: String,
    pub cookies: Option<Utf8PathBuf>,
    pub min_sleep: Duration,
    pub max_sleep: Duration,
}

impl YtDlpOptions {
    pub fn from_settings(settings: &PlatformSettings, cookies: Option<Utf8PathBuf>) -> Self {
        Self {
            format: settings.format.clone(),
            cookies,
            min_sleep: settings.min_sleep,
            max_sleep: settings.max_sleep,
        }
    }
}

impl YtDlpClient {
    /// Uses `program` when given, otherwise looks `yt-dlp` up on `PATH`.
    pub fn new(program: Option<&Utf8Path>, options: YtDlpOptions) -> Self {
        let program = match program {
            Some(path) => Some(path.as_std_path().to_path_buf()),
            None => find_in_path("yt-dlp"),
        };
        if let Some(cookies) = &options.cookies {
            if !cookies.as_std_path().exists() {
                tracing::warn!(%cookies, "cookie file not found; yt-dlp will likely fail on private media");
            }
        }
        Self { program, options }
    }

    pub fn is_available(&self) -> bool {
        self.program.is_some()
    }

    pub fn build_args(&self, url: &str, output: &Path) -> Vec<String> {
        let mut args = vec![
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--no-playlist".to_string(),
            "--format".to_string(),
            self.options.format.clone(),
            "--output".to_string(),
            output.to_string_lossy().to_string(),
        ];
        if let Some(cookies) = &self.options.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.to_string());
        }
        if !self.options.max_sleep.is_zero() {
            args.push("--sleep-interval".to_string());
            args.push(secs_arg(self.options.min_sleep));
            args.push("--max-sleep-interval".to_string());
            args.push(secs_arg(self.options.max_sleep));
        }
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    fn run_cmd(&self, program: &Path, args: &[String]) -> Result<(), ClipsortError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| ClipsortError::PlatformDownload(err.to_string()))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("{} exited with {}", program.display(), output.status)
        } else {
            stderr
        };
        Err(ClipsortError::PlatformDownload(message))
    }
}

impl Downloader for YtDlpClient {
    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), ClipsortError> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| ClipsortError::MissingTool("yt-dlp".to_string()))?;
        let parent = destination
            .parent()
            .ok_or_else(|| ClipsortError::Filesystem("invalid destination path".to_string()))?;

        // yt-dlp writes its own fragments; keep them in a scratch dir so a failed run
        // never leaves anything at the destination path.
        let scratch = tempfile::Builder::new()
            .prefix(".clipsort-ytdlp")
            .tempdir_in(parent.as_std_path())
            .map_err(|err| ClipsortError::Filesystem(err.to_string()))?;
        let output = scratch.path().join(format!("clip.{OUTPUT_EXTENSION}"));

        let args = self.build_args(url, &output);
        self.run_cmd(program, &args)?;

        if !output.exists() {
            return Err(ClipsortError::PlatformDownload(format!(
                "yt-dlp reported success but produced no file for {url}"
            )));
        }
        std::fs::rename(&output, destination.as_std_path())
            .map_err(|err| ClipsortError::Filesystem(format!("move to {destination}: {err}")))
    }
}

fn secs_arg(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{secs}")
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
