use serial_test::serial;
use std::env;
use std::fs;

use vpbank_text2sql_ui::config::AppConfig;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("T2S_SERVER__PORT");
        env::remove_var("T2S_BACKEND__BASE_URL");
        env::remove_var("T2S_BACKEND__MOCK");
        env::remove_var("T2S_CHAT__REVEAL_SPEED_MS");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
        env::remove_var("BACKEND_URL");
        env::remove_var("MOCK_BACKEND");
        env::remove_var("AUTH_STATE_PATH");
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["test"]).expect("Failed to load defaults");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.static_dir, "static");
    assert_eq!(config.backend.base_url, "http://localhost:8000");
    assert!(!config.backend.mock);
    assert_eq!(config.chat.reveal_speed_ms, 20);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("T2S_SERVER__PORT", "9090");
        env::set_var("T2S_BACKEND__BASE_URL", "http://env-host:8000");
        env::set_var("T2S_BACKEND__MOCK", "true");
    }

    let config = AppConfig::load_from_args(["test"]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.backend.base_url, "http://env-host:8000");
    assert!(config.backend.mock);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("T2S_SERVER__PORT", "9090");
    }

    let config = AppConfig::load_from_args(["test", "--port", "7171"])
        .expect("Failed to load config");
    assert_eq!(config.server.port, 7171);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = dir.path().join("test_config.yaml");
    fs::write(
        &file_path,
        r#"
server:
  port: 7070
backend:
  base_url: "http://backend.internal:8000"
"#,
    )
    .expect("Failed to write temp config");

    let config = AppConfig::load_from_args([
        "test",
        "--config",
        file_path.to_str().expect("utf-8 path"),
    ])
    .expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.backend.base_url, "http://backend.internal:8000");
    // Values the file omits keep their defaults.
    assert_eq!(config.chat.reveal_speed_ms, 20);

    clear_env_vars();
}

#[test]
#[serial]
fn test_backend_cli_flags() {
    clear_env_vars();

    let config = AppConfig::load_from_args([
        "test",
        "--backend-url",
        "http://10.0.0.5:8000",
        "--mock-backend",
        "true",
        "--auth-state-path",
        "/tmp/auth.json",
    ])
    .expect("Failed to load config");
    assert_eq!(config.backend.base_url, "http://10.0.0.5:8000");
    assert!(config.backend.mock);
    assert_eq!(config.auth.state_path, "/tmp/auth.json");

    clear_env_vars();
}
