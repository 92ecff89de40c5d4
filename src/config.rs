//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const LOCAL_API_ROOT: &str = "http://localhost:8000/api/";
pub const PRODUCTION_API_ROOT: &str = "https://bingoapp.pythonanywhere.com/api/";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const STATE_DIR_NAME: &str = "aquatherm";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// Which deployment of the API the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiEnvironment {
    Local,
    Production,
}

impl ApiEnvironment {
    /// Detect the environment from a page location or host string.
    /// Anything served from `localhost` talks to the local API.
    #[must_use]
    pub fn from_location(location: &str) -> Self {
        if location.contains("localhost") { Self::Local } else { Self::Production }
    }

    #[must_use]
    pub fn api_root(self) -> &'static str {
        match self {
            Self::Local => LOCAL_API_ROOT,
            Self::Production => PRODUCTION_API_ROOT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub environment: ApiEnvironment,
    /// API root, always ending in `/`.
    pub api_root: String,
    pub state_dir: PathBuf,
    pub timeouts: HttpTimeouts,
}

impl ClientConfig {
    /// Build a config for `environment` with default state dir and timeouts.
    #[must_use]
    pub fn for_environment(environment: ApiEnvironment) -> Self {
        Self {
            environment,
            api_root: environment.api_root().to_owned(),
            state_dir: default_state_dir(),
            timeouts: HttpTimeouts::default(),
        }
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `AQUATHERM_ENV`: `production` (default) or `local`
    /// - `AQUATHERM_API_ROOT`: overrides the environment's API root
    /// - `AQUATHERM_STATE_DIR`: where the session snapshot is kept
    /// - `AQUATHERM_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AQUATHERM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if `AQUATHERM_ENV` names an unknown environment or a
    /// timeout is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = parse_environment(std::env::var("AQUATHERM_ENV").ok().as_deref())?;
        let api_root = std::env::var("AQUATHERM_API_ROOT")
            .map(|root| normalize_api_root(&root))
            .unwrap_or_else(|_| environment.api_root().to_owned());
        let state_dir = std::env::var("AQUATHERM_STATE_DIR").map_or_else(|_| default_state_dir(), PathBuf::from);
        let timeouts = HttpTimeouts {
            request_secs: env_parse_secs("AQUATHERM_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_secs("AQUATHERM_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self { environment, api_root, state_dir, timeouts })
    }
}

fn parse_environment(raw: Option<&str>) -> Result<ApiEnvironment, ConfigError> {
    match raw.unwrap_or("production") {
        "production" => Ok(ApiEnvironment::Production),
        "local" => Ok(ApiEnvironment::Local),
        other => Err(ConfigError::Parse(format!("unknown AQUATHERM_ENV: {other}"))),
    }
}

fn env_parse_secs(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::Parse(format!("{key} must be a positive integer, got '{raw}'"))),
    }
}

fn normalize_api_root(raw: &str) -> String {
    format!("{}/", raw.trim().trim_end_matches('/'))
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(".aquatherm"), |dir| dir.join(STATE_DIR_NAME))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
