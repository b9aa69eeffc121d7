use std::time::Duration;

use assert_matches::assert_matches;

use clipsort::config::{Config, ConfigLoader, ConfigOverrides, ResolvedConfig};
use clipsort::error::ClipsortError;

fn defaults() -> ResolvedConfig {
    ConfigLoader::resolve_config(Config::default(), ConfigOverrides::default()).unwrap()
}

#[test]
fn defaults_match_documented_values() {
    let config = defaults();
    assert_eq!(config.dataset, "datatrainfix.csv");
    assert_eq!(config.output_dir, "data");
    assert_eq!(config.failure_file, "failed_ids.txt");
    assert_eq!(config.cookies, None);
    assert_eq!(config.batch_size, 10);
    assert_eq!(config.pacing.job_delay, Duration::from_secs(3));
    assert_eq!(config.pacing.batch_delay, Duration::from_secs(30));
    assert_eq!(config.platform.format, "mp4");
    assert_eq!(config.columns.id, "id");
    assert_eq!(config.columns.url, "video");
    assert_eq!(config.columns.label, "emotion");
    assert_eq!(config.platform_hosts, vec!["instagram.com".to_string()]);
    assert_eq!(config.generic_hosts, vec!["drive.google.com".to_string()]);
}

#[test]
fn overrides_win_over_file_values() {
    let config = Config {
        dataset: Some("from-file.csv".to_string()),
        batch_size: Some(5),
        cookies: Some("file-cookies.txt".to_string()),
        ..Config::default()
    };
    let overrides = ConfigOverrides {
        dataset: Some("from-cli.csv".to_string()),
        batch_size: Some(2),
        ..ConfigOverrides::default()
    };
    let resolved = ConfigLoader::resolve_config(config, overrides).unwrap();
    assert_eq!(resolved.dataset, "from-cli.csv");
    assert_eq!(resolved.batch_size, 2);
    assert_eq!(
        resolved.cookies.as_ref().map(|path| path.as_str()),
        Some("file-cookies.txt")
    );
}

#[test]
fn zero_batch_size_is_rejected() {
    let overrides = ConfigOverrides {
        batch_size: Some(0),
        ..ConfigOverrides::default()
    };
    let err = ConfigLoader::resolve_config(Config::default(), overrides).unwrap_err();
    assert_matches!(err, ClipsortError::InvalidConfig(_));
}

#[test]
fn reads_json_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("clipsort.json");
    std::fs::write(
        &path,
        r#"{
            "dataset": "clips.csv",
            "job_delay_secs": 0.5,
            "batch_delay_secs": 0,
            "columns": { "url": "link" },
            "routes": { "platform_hosts": ["instagram.com", "tiktok.com"] }
        }"#,
    )
    .unwrap();

    let resolved =
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap();

    assert_eq!(resolved.dataset, "clips.csv");
    assert_eq!(resolved.pacing.job_delay, Duration::from_millis(500));
    assert_eq!(resolved.pacing.batch_delay, Duration::ZERO);
    assert_eq!(resolved.columns.url, "link");
    assert_eq!(resolved.columns.label, "emotion");
    assert_eq!(resolved.platform_hosts.len(), 2);
    assert_eq!(resolved.generic_hosts, vec!["drive.google.com".to_string()]);
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, ClipsortError::ConfigRead(_));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("clipsort.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, ClipsortError::ConfigParse(_));
}
