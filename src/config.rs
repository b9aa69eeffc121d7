use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::ClipsortError;
use crate::pacing::PacingPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "clipsort.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub cookies: Option<String>,
    #[serde(default)]
    pub failure_file: Option<String>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub job_delay_secs: Option<f64>,
    #[serde(default)]
    pub batch_delay_secs: Option<f64>,
    #[serde(default)]
    pub platform: Option<PlatformEntry>,
    #[serde(default)]
    pub columns: Option<ColumnsEntry>,
    #[serde(default)]
    pub routes: Option<RoutesEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PlatformEntry {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub min_sleep_secs: Option<f64>,
    #[serde(default)]
    pub max_sleep_secs: Option<f64>,
    #[serde(default)]
    pub ytdlp_path: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ColumnsEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RoutesEntry {
    #[serde(default)]
    pub platform_hosts: Option<Vec<String>>,
    #[serde(default)]
    pub generic_hosts: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub id: String,
    pub url: String,
    pub label: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            url: "video".to_string(),
            label: "emotion".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSettings {
    pub format: String,
    pub min_sleep: Duration,
    pub max_sleep: Duration,
    pub ytdlp_path: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub dataset: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub cookies: Option<Utf8PathBuf>,
    pub failure_file: Utf8PathBuf,
    pub batch_size: usize,
    pub pacing: PacingPolicy,
    pub platform: PlatformSettings,
    pub columns: ColumnNames,
    pub platform_hosts: Vec<String>,
    pub generic_hosts: Vec<String>,
}

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dataset: Option<String>,
    pub output_dir: Option<String>,
    pub cookies: Option<String>,
    pub failure_file: Option<String>,
    pub batch_size: Option<usize>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `clipsort.json` when present. Without either, defaults apply.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, ClipsortError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| ClipsortError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| ClipsortError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, ClipsortError> {
        let batch_size = overrides
            .batch_size
            .or(config.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ClipsortError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }

        let pacing = PacingPolicy {
            job_delay: seconds(
                "job_delay_secs",
                config.job_delay_secs.unwrap_or(DEFAULT_JOB_DELAY_SECS),
            )?,
            batch_delay: seconds(
                "batch_delay_secs",
                config.batch_delay_secs.unwrap_or(DEFAULT_BATCH_DELAY_SECS),
            )?,
        };

        let platform_entry = config.platform.unwrap_or_default();
        let min_sleep = seconds(
            "platform.min_sleep_secs",
            platform_entry
                .min_sleep_secs
                .unwrap_or(DEFAULT_MIN_SLEEP_SECS),
        )?;
        let max_sleep = seconds(
            "platform.max_sleep_secs",
            platform_entry
                .max_sleep_secs
                .unwrap_or(DEFAULT_MAX_SLEEP_SECS),
        )?;
        if min_sleep > max_sleep {
            return Err(ClipsortError::InvalidConfig(
                "platform.min_sleep_secs must not exceed platform.max_sleep_secs".to_string(),
            ));
        }
        let platform = PlatformSettings {
            format: platform_entry
                .format
                .unwrap_or_else(|| "mp4".to_string()),
            min_sleep,
            max_sleep,
            ytdlp_path: platform_entry.ytdlp_path.map(Utf8PathBuf::from),
        };

        let defaults = ColumnNames::default();
        let columns = match config.columns {
            Some(entry) => ColumnNames {
                id: entry.id.unwrap_or(defaults.id),
                url: entry.url.unwrap_or(defaults.url),
                label: entry.label.unwrap_or(defaults.label),
            },
            None => defaults,
        };

        let routes = config.routes.unwrap_or_default();
        let platform_hosts = routes
            .platform_hosts
            .unwrap_or_else(default_platform_hosts);
        let generic_hosts = routes.generic_hosts.unwrap_or_else(default_generic_hosts);

        Ok(ResolvedConfig {
            dataset: Utf8PathBuf::from(
                overrides
                    .dataset
                    .or(config.dataset)
                    .unwrap_or_else(|| "datatrainfix.csv".to_string()),
            ),
            output_dir: Utf8PathBuf::from(
                overrides
                    .output_dir
                    .or(config.output_dir)
                    .unwrap_or_else(|| "data".to_string()),
            ),
            cookies: overrides
                .cookies
                .or(config.cookies)
                .map(Utf8PathBuf::from),
            failure_file: Utf8PathBuf::from(
                overrides
                    .failure_file
                    .or(config.failure_file)
                    .unwrap_or_else(|| "failed_ids.txt".to_string()),
            ),
            batch_size,
            pacing,
            platform,
            columns,
            platform_hosts,
            generic_hosts,
        })
    }
}

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_JOB_DELAY_SECS: f64 = 3.0;
const DEFAULT_BATCH_DELAY_SECS: f64 = 30.0;
const DEFAULT_MIN_SLEEP_SECS: f64 = 1.0;
const DEFAULT_MAX_SLEEP_SECS: f64 = 4.0;

pub fn default_platform_hosts() -> Vec<String> {
    vec!["instagram.com".to_string()]
}

pub fn default_generic_hosts() -> Vec<String> {
    vec!["drive.google.com".to_string()]
}

fn seconds(field: &str, value: f64) -> Result<Duration, ClipsortError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ClipsortError::InvalidConfig(format!(
            "{field} must be a finite, non-negative number of seconds"
        ))
    })
}
