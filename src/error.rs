//! Error types for the bridge.
//!
//! Only [`ConfigError`] and [`CredentialError`] are meant to stop the
//! process. Everything raised on the hot path is caught where it happens
//! and turned into a log line plus a skip.

use std::path::PathBuf;

/// Invalid or missing configuration. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value was empty or unset.
    #[error("missing required setting {name} (env {env})")]
    Missing {
        /// Config field name.
        name: &'static str,
        /// Environment variable that supplies it.
        env: &'static str,
    },

    /// A value was present but unusable.
    #[error("invalid setting {name}: {reason}")]
    Invalid {
        /// Config field name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A config or credential file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config or credential file is not the expected JSON shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Unusable private key material. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The key string does not contain a readable PEM block.
    #[error("private key is not valid PEM: {0}")]
    MalformedPem(String),

    /// The PEM block is not a PKCS#8 `PRIVATE KEY` container.
    #[error("private key must be a PKCS#8 container, found {0}")]
    NotPkcs8(&'static str),

    /// The PKCS#8 container does not hold a usable RSA key.
    #[error("private key is not an RSA key: {0}")]
    NotRsa(String),
}

/// Failure to produce a signed assertion for a single request.
#[derive(Debug, thiserror::Error)]
#[error("failed to sign assertion: {0}")]
pub struct SignError(#[from] pub jsonwebtoken::errors::Error);

/// Failure to refresh the application registry.
#[derive(Debug, thiserror::Error)]
pub enum IconError {
    /// Transport-level failure or timeout.
    #[error("registry request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Registry answered with a non-success status.
    #[error("registry returned HTTP {0}")]
    Status(u16),

    /// Response body is not a JSON application list.
    #[error("registry response is not an application list: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Failure on the upstream event stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Connect or handshake failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Handshake did not finish in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(std::time::Duration),

    /// Transport read failure.
    #[error("read failed: {0}")]
    Read(String),

    /// Server closed the connection or the stream ended.
    #[error("connection closed (code {code}): {reason}")]
    Closed {
        /// WebSocket close code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// A frame could not be decoded into an event.
    #[error("undecodable frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that prevents the bridge from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Bad configuration or credential file.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unusable signing key.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
