use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_loads_defaults() {
    let config = CasepollConfig::load(None, None::<&()>).expect("Should load default config");

    assert_eq!(
        config.endpoint.url,
        "https://egov.uscis.gov/casestatus/mycasestatus.do"
    );
    assert_eq!(config.parallel.min_items_for_parallel, 21);
    assert_eq!(config.parallel.remainder, RemainderPolicy::Keep);
    assert_eq!(config.report.format, ReportFormat::Yaml);
    assert_eq!(config.report.file_prefix, "data");
    assert!(config.endpoint.timeout().is_none());
}

#[test]
fn test_embedded_defaults_match_default_impl() {
    let loaded = CasepollConfig::load(None, None::<&()>).unwrap();
    let built = CasepollConfig::default();

    assert_eq!(
        serde_json::to_value(&loaded).unwrap(),
        serde_json::to_value(&built).unwrap()
    );
}

#[test]
fn test_custom_yaml_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("custom.yaml");
    fs::write(
        &config_path,
        r#"
parallel:
  remainder: drop
  max_threads: 4
report:
  format: json
  sort_by_case: true
"#,
    )
    .unwrap();

    let config = CasepollConfig::load(config_path.to_str(), None::<&()>).unwrap();
    assert_eq!(config.parallel.remainder, RemainderPolicy::Drop);
    assert_eq!(config.parallel.max_threads, 4);
    assert_eq!(config.report.format, ReportFormat::Json);
    assert!(config.report.sort_by_case);
    // Untouched keys keep their defaults
    assert_eq!(config.parallel.thread_percentage, 100);
}

#[test]
fn test_custom_toml_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("custom.toml");
    fs::write(
        &config_path,
        r#"
[endpoint]
url = "http://127.0.0.1:9/status"
timeout_secs = 5

[rate_limit]
policy = "fixed"
min_interval_ms = 250
"#,
    )
    .unwrap();

    let config = CasepollConfig::load(config_path.to_str(), None::<&()>).unwrap();
    assert_eq!(config.endpoint.url, "http://127.0.0.1:9/status");
    assert_eq!(config.endpoint.timeout(), Some(Duration::from_secs(5)));
    assert_eq!(config.rate_limit.policy, RateLimitPolicy::Fixed);
    assert_eq!(config.rate_limit.min_interval_ms, 250);
}

#[test]
fn test_missing_custom_config_is_an_error() {
    let result = CasepollConfig::load(Some("does-not-exist.toml"), None::<&()>);
    assert!(result.is_err());
}

#[test]
fn test_cli_overrides_win() {
    let overrides = serde_json::json!({
        "parallel": { "max_threads": 3, "remainder": "drop" },
        "report": { "output_dir": "/tmp/reports" }
    });

    let config = CasepollConfig::load(None, Some(overrides)).unwrap();
    assert_eq!(config.parallel.max_threads, 3);
    assert_eq!(config.parallel.remainder, RemainderPolicy::Drop);
    assert_eq!(config.report.output_dir, PathBuf::from("/tmp/reports"));
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = CasepollConfig::default();
    assert!(config.validate().is_ok());

    config.parallel.thread_percentage = 0;
    assert!(config.validate().is_err());

    let mut config = CasepollConfig::default();
    config.endpoint.url = "  ".to_string();
    assert!(config.validate().is_err());

    let mut config = CasepollConfig::default();
    config.rate_limit.policy = RateLimitPolicy::Fixed;
    config.rate_limit.min_interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = CasepollConfig::default();
    config.rate_limit.refill_per_sec = 0.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_tiny_refill_rate() {
    let mut config = CasepollConfig::default();
    config.rate_limit.capacity = 1;
    config.rate_limit.refill_per_sec = 1e-20;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("rate_limit.refill_per_sec"));

    config.rate_limit.refill_per_sec = MIN_REFILL_PER_SEC;
    assert!(config.validate().is_ok());

    config.rate_limit.refill_per_sec = f64::NAN;
    assert!(config.validate().is_err());
}
