//! Configuration loading.
//!
//! Settings come from built-in defaults, then an optional JSON file, then
//! environment variables (which always win). Secrets are never written
//! back out when the config is serialized.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_PUSH_API_URL, HTTP_REQUEST_TIMEOUT, RECONNECT_INITIAL_DELAY, RECONNECT_MAX_DELAY,
};
use crate::error::ConfigError;

/// Default location of the service-account credential file.
pub const DEFAULT_CREDENTIAL_PATH: &str = "/app/data/private.json";

/// Configuration for the bridge.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    /// Push token of the paired HarmonyOS device. NOT serialized.
    #[serde(skip_serializing)]
    pub device_token: String,
    /// Host the Gotify server listens on.
    pub gotify_host: String,
    /// Port the Gotify server listens on.
    pub gotify_port: u16,
    /// Gotify client token used for the stream and the application list. NOT serialized.
    #[serde(skip_serializing)]
    pub gotify_token: String,
    /// Public base URL of the Gotify server, prefixed to application image paths.
    pub gotify_url: String,
    /// Path of the service-account credential JSON file.
    pub credential_path: PathBuf,
    /// Push Kit API base URL.
    pub push_api_url: String,
    /// Timeout in seconds for every outbound HTTP request.
    pub http_timeout_secs: u64,
    /// First reconnect delay in milliseconds.
    pub reconnect_initial_ms: u64,
    /// Maximum reconnect delay in milliseconds.
    pub reconnect_max_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_token: String::new(),
            gotify_host: "127.0.0.1".to_string(),
            gotify_port: 80,
            gotify_token: String::new(),
            gotify_url: String::new(),
            credential_path: PathBuf::from(DEFAULT_CREDENTIAL_PATH),
            push_api_url: DEFAULT_PUSH_API_URL.to_string(),
            http_timeout_secs: HTTP_REQUEST_TIMEOUT.as_secs(),
            reconnect_initial_ms: duration_millis(RECONNECT_INITIAL_DELAY),
            reconnect_max_ms: duration_millis(RECONNECT_MAX_DELAY),
        }
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    /// Loads configuration: defaults, then `path` if given, then environment.
    ///
    /// The result is validated; a config that cannot run the bridge is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::resolve(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Same layering as [`Self::load`] without validation.
    ///
    /// For tools that only need part of the config (e.g. the credential path).
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies overrides from a variable lookup (the process environment in production).
    ///
    /// Numeric values that fail to parse are ignored and the previous value kept.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("HARMONY_CLIENT_TOKEN") {
            self.device_token = token;
        }

        if let Some(host) = lookup("GOTIFY_SERVER_HOST") {
            self.gotify_host = host;
        }

        if let Some(port) = lookup("GOTIFY_SERVER_PORT") {
            if let Ok(port) = port.trim().parse::<u16>() {
                self.gotify_port = port;
            }
        }

        if let Some(token) = lookup("GOTIFY_CLIENT_TOKEN") {
            self.gotify_token = token;
        }

        if let Some(url) = lookup("GOTIFY_SERVER_URL") {
            self.gotify_url = url;
        }

        if let Some(path) = lookup("HARMONY_CREDENTIAL_FILE") {
            self.credential_path = PathBuf::from(path);
        }

        if let Some(url) = lookup("HARMONY_PUSH_API_URL") {
            self.push_api_url = url;
        }

        if let Some(timeout) = lookup("BRIDGE_HTTP_TIMEOUT") {
            if let Ok(timeout) = timeout.trim().parse::<u64>() {
                self.http_timeout_secs = timeout;
            }
        }

        if let Some(initial) = lookup("BRIDGE_RECONNECT_INITIAL_MS") {
            if let Ok(initial) = initial.trim().parse::<u64>() {
                self.reconnect_initial_ms = initial;
            }
        }

        if let Some(max) = lookup("BRIDGE_RECONNECT_MAX_MS") {
            if let Ok(max) = max.trim().parse::<u64>() {
                self.reconnect_max_ms = max;
            }
        }
    }

    /// Checks that every value needed to run the bridge is present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_token.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "device_token",
                env: "HARMONY_CLIENT_TOKEN",
            });
        }
        if self.gotify_token.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "gotify_token",
                env: "GOTIFY_CLIENT_TOKEN",
            });
        }
        if self.gotify_host.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "gotify_host",
                env: "GOTIFY_SERVER_HOST",
            });
        }
        if self.gotify_port == 0 {
            return Err(ConfigError::Invalid {
                name: "gotify_port",
                reason: "port must be non-zero".to_string(),
            });
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "http_timeout_secs",
                reason: "timeout must be at least one second".to_string(),
            });
        }
        if self.reconnect_initial_ms == 0 || self.reconnect_initial_ms > self.reconnect_max_ms {
            return Err(ConfigError::Invalid {
                name: "reconnect_initial_ms",
                reason: format!(
                    "must be non-zero and at most reconnect_max_ms ({})",
                    self.reconnect_max_ms
                ),
            });
        }
        reqwest::Url::parse(&self.push_api_url).map_err(|e| ConfigError::Invalid {
            name: "push_api_url",
            reason: e.to_string(),
        })?;
        self.stream_url()?;
        self.registry_url()?;
        Ok(())
    }

    /// WebSocket URL of the Gotify message stream, with the client token attached.
    pub fn stream_url(&self) -> Result<reqwest::Url, ConfigError> {
        self.gotify_endpoint("ws", "stream")
    }

    /// URL of the Gotify application list, with the client token attached.
    pub fn registry_url(&self) -> Result<reqwest::Url, ConfigError> {
        self.gotify_endpoint("http", "application")
    }

    fn gotify_endpoint(&self, scheme: &str, path: &str) -> Result<reqwest::Url, ConfigError> {
        let base = format!("{scheme}://{}:{}/{path}", self.gotify_host, self.gotify_port);
        let mut url = reqwest::Url::parse(&base).map_err(|e| ConfigError::Invalid {
            name: "gotify_host",
            reason: format!("{base}: {e}"),
        })?;
        url.query_pairs_mut().append_pair("token", &self.gotify_token);
        Ok(url)
    }

    /// Timeout applied to every outbound HTTP request.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// First reconnect delay.
    pub fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    /// Reconnect delay ceiling.
    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }
}
