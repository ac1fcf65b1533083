//! Tests for loading configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use serial_test::serial;
use weibo_archiver::config::{Config, ConfigError};

const VARS: &[&str] = &[
    "WEIBO_UID",
    "WEIBO_COOKIE",
    "WEIBO_DAYS",
    "WEIBO_API_BASE",
    "DATABASE_PATH",
    "EXPORT_DIR",
    "REQUEST_TIMEOUT_SECS",
    "PAGE_DELAY_MS",
    "POST_DELAY_MS",
    "IMAGE_WORKERS",
    "SCHEDULE_TIMES",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();
    std::env::set_var("WEIBO_UID", "1234567890");
    std::env::set_var("WEIBO_COOKIE", "SUB=xyz");

    let config = Config::from_env().expect("config should load");

    assert_eq!(config.account_id, "1234567890");
    assert_eq!(config.session_cookie, "SUB=xyz");
    assert_eq!(config.days_back, None);
    assert_eq!(config.api_base_url, "https://m.weibo.cn");
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.page_delay, Duration::from_millis(2000));
    assert_eq!(config.post_delay, Duration::from_millis(1000));
    assert_eq!(
        config.database_path,
        PathBuf::from("./data/weibo_data.sqlite")
    );
    assert_eq!(config.export_dir, PathBuf::from("./static"));
    assert_eq!(config.image_workers, 10);
    assert_eq!(
        config.schedule_times,
        vec![
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        ]
    );
    assert!(config.validate().is_ok());
    assert!(config.validate_credentials().is_ok());

    clear_env();
}

#[test]
#[serial]
fn test_overrides() {
    clear_env();
    std::env::set_var("WEIBO_UID", "42");
    std::env::set_var("WEIBO_COOKIE", "SUB=xyz");
    std::env::set_var("WEIBO_DAYS", "7");
    std::env::set_var("PAGE_DELAY_MS", "0");
    std::env::set_var("IMAGE_WORKERS", "3");
    std::env::set_var("SCHEDULE_TIMES", "06:30");

    let config = Config::from_env().unwrap();

    assert_eq!(config.days_back, Some(7));
    assert_eq!(config.page_delay, Duration::ZERO);
    assert_eq!(config.image_workers, 3);
    assert_eq!(
        config.schedule_times,
        vec![NaiveTime::from_hms_opt(6, 30, 0).unwrap()]
    );

    clear_env();
}

#[test]
#[serial]
fn test_missing_account() {
    clear_env();
    std::env::set_var("WEIBO_COOKIE", "SUB=xyz");

    let config = Config::from_env().expect("config should load without credentials");

    assert!(matches!(
        config.validate_credentials(),
        Err(ConfigError::MissingEnvVar(ref name)) if name == "WEIBO_UID"
    ));

    clear_env();
}

#[test]
#[serial]
fn test_export_settings_need_no_credentials() {
    clear_env();
    std::env::set_var("EXPORT_DIR", "/tmp/site");

    let config = Config::from_env().expect("config should load without credentials");

    assert!(config.validate().is_ok());
    assert!(config.validate_credentials().is_err());
    assert_eq!(config.export_dir, PathBuf::from("/tmp/site"));

    clear_env();
}

#[test]
#[serial]
fn test_lookback_upper_bound() {
    clear_env();
    std::env::set_var("WEIBO_DAYS", "200000000");

    let config = Config::from_env().expect("value fits in u32");

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { ref name, .. }) if name == "WEIBO_DAYS"
    ));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_numbers() {
    clear_env();
    std::env::set_var("WEIBO_UID", "42");
    std::env::set_var("WEIBO_COOKIE", "SUB=xyz");
    std::env::set_var("WEIBO_DAYS", "three");

    assert!(matches!(
        Config::from_env(),
        Err(ConfigError::ParseInt { ref name, .. }) if name == "WEIBO_DAYS"
    ));

    std::env::remove_var("WEIBO_DAYS");
    std::env::set_var("SCHEDULE_TIMES", "25:99");
    assert!(matches!(
        Config::from_env(),
        Err(ConfigError::InvalidValue { ref name, .. }) if name == "SCHEDULE_TIMES"
    ));

    clear_env();
}
