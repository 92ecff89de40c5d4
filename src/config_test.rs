use super::*;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// # Safety
/// Callers must hold `env_guard()` so env mutations do not race.
unsafe fn clear_aquatherm_env() {
    unsafe {
        std::env::remove_var("AQUATHERM_ENV");
        std::env::remove_var("AQUATHERM_API_ROOT");
        std::env::remove_var("AQUATHERM_STATE_DIR");
        std::env::remove_var("AQUATHERM_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("AQUATHERM_CONNECT_TIMEOUT_SECS");
    }
}

// =============================================================================
// ApiEnvironment
// =============================================================================

#[test]
fn localhost_location_is_local() {
    assert_eq!(ApiEnvironment::from_location("http://localhost:3000/home"), ApiEnvironment::Local);
}

#[test]
fn other_location_is_production() {
    assert_eq!(ApiEnvironment::from_location("https://aquatherm.example/"), ApiEnvironment::Production);
}

#[test]
fn api_roots_end_with_slash() {
    assert!(ApiEnvironment::Local.api_root().ends_with('/'));
    assert!(ApiEnvironment::Production.api_root().ends_with('/'));
}

#[test]
fn normalize_appends_single_slash() {
    assert_eq!(normalize_api_root("http://h/api"), "http://h/api/");
    assert_eq!(normalize_api_root("http://h/api//"), "http://h/api/");
}

// =============================================================================
// ClientConfig::from_env
// =============================================================================

#[test]
fn from_env_defaults_to_production() {
    let _env = env_guard();
    unsafe { clear_aquatherm_env() };

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.environment, ApiEnvironment::Production);
    assert_eq!(cfg.api_root, PRODUCTION_API_ROOT);
    assert_eq!(cfg.timeouts, HttpTimeouts::default());
}

#[test]
fn from_env_parses_overrides() {
    let _env = env_guard();
    unsafe {
        clear_aquatherm_env();
        std::env::set_var("AQUATHERM_ENV", "local");
        std::env::set_var("AQUATHERM_API_ROOT", "http://example.test/api");
        std::env::set_var("AQUATHERM_STATE_DIR", "/tmp/aq-state");
        std::env::set_var("AQUATHERM_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("AQUATHERM_CONNECT_TIMEOUT_SECS", "7");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.environment, ApiEnvironment::Local);
    assert_eq!(cfg.api_root, "http://example.test/api/");
    assert_eq!(cfg.state_dir, PathBuf::from("/tmp/aq-state"));
    assert_eq!(cfg.timeouts, HttpTimeouts { request_secs: 42, connect_secs: 7 });

    unsafe { clear_aquatherm_env() };
}

#[test]
fn from_env_local_uses_local_root() {
    let _env = env_guard();
    unsafe {
        clear_aquatherm_env();
        std::env::set_var("AQUATHERM_ENV", "local");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.api_root, LOCAL_API_ROOT);

    unsafe { clear_aquatherm_env() };
}

#[test]
fn from_env_unknown_environment_errors() {
    let _env = env_guard();
    unsafe {
        clear_aquatherm_env();
        std::env::set_var("AQUATHERM_ENV", "staging");
    }

    let err = ClientConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("unknown AQUATHERM_ENV"));

    unsafe { clear_aquatherm_env() };
}

#[test]
fn from_env_zero_timeout_errors() {
    let _env = env_guard();
    unsafe {
        clear_aquatherm_env();
        std::env::set_var("AQUATHERM_REQUEST_TIMEOUT_SECS", "0");
    }

    let err = ClientConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("AQUATHERM_REQUEST_TIMEOUT_SECS"));

    unsafe { clear_aquatherm_env() };
}
