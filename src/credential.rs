//! Service-account credential file.
//!
//! The file is the JSON document downloaded from the Push Kit console. It is
//! read once at startup and never modified.

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

/// Service-account key record used to sign Push Kit assertions.
#[derive(Clone, Deserialize)]
pub struct ServiceCredential {
    /// Push Kit project identifier (part of the send URL).
    pub project_id: String,
    /// Identifier of the key pair, carried in the assertion header as `kid`.
    pub key_id: String,
    /// PKCS#8 PEM encoded RSA private key.
    pub private_key: String,
    /// Service account identifier, used as the `iss` claim.
    pub sub_account: String,
    /// Authorization audience, used as the `aud` claim.
    pub auth_uri: String,
    /// OAuth token endpoint.
    #[serde(default)]
    pub token_uri: String,
    /// Provider certificate endpoint.
    #[serde(default)]
    pub auth_provider_cert_uri: String,
    /// Client certificate endpoint.
    #[serde(default)]
    pub client_cert_uri: String,
}

impl std::fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("project_id", &self.project_id)
            .field("key_id", &self.key_id)
            .field("sub_account", &self.sub_account)
            .field("auth_uri", &self.auth_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceCredential {
    /// Reads and parses the credential file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let credential: Self =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        credential.check_fields()?;
        Ok(credential)
    }

    fn check_fields(&self) -> Result<(), ConfigError> {
        let required = [
            ("project_id", &self.project_id),
            ("key_id", &self.key_id),
            ("private_key", &self.private_key),
            ("sub_account", &self.sub_account),
            ("auth_uri", &self.auth_uri),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    name,
                    reason: "empty in credential file".to_string(),
                });
            }
        }
        Ok(())
    }
}
