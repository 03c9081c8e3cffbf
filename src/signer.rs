//! Service-account assertion signing.
//!
//! Push Kit accepts a self-signed JWT in place of an OAuth access token.
//! The assertion is signed with PS256 using the service account's RSA key
//! and carries the key id in its header so the provider can pick the
//! matching public key.
//!
//! The key is decoded and test-signed once in [`CredentialSigner::new`];
//! a bad key is a startup error. After that, [`CredentialSigner::sign`]
//! can only fail on a backend error, which callers treat as a per-request
//! failure.

// Rust guideline compliant 2026-02

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rustls_pemfile::Item;
use serde::{Deserialize, Serialize};

use crate::constants::ASSERTION_LIFETIME_SECS;
use crate::credential::ServiceCredential;
use crate::error::{CredentialError, SignError};

/// Claim set of a Push Kit service-account assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Service account identifier.
    pub iss: String,
    /// Authorization audience URI.
    pub aud: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// A freshly minted bearer assertion.
#[derive(Clone)]
pub struct SignedAssertion {
    /// Compact `header.claims.signature` token.
    pub token: String,
    /// Issued-at, seconds since the Unix epoch.
    pub issued_at: i64,
    /// Expiry, seconds since the Unix epoch.
    pub expires_at: i64,
}

impl std::fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedAssertion")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl SignedAssertion {
    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Signs assertions for one service account.
#[derive(Clone)]
pub struct CredentialSigner {
    key: EncodingKey,
    key_id: String,
    issuer: String,
    audience: String,
}

impl std::fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSigner")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl CredentialSigner {
    /// Decodes the credential's private key and proves it can sign.
    ///
    /// The key must be a PEM `PRIVATE KEY` (PKCS#8) block holding an RSA key.
    pub fn new(credential: &ServiceCredential) -> Result<Self, CredentialError> {
        let key = decode_private_key(&credential.private_key)?;
        let signer = Self {
            key,
            key_id: credential.key_id.clone(),
            issuer: credential.sub_account.clone(),
            audience: credential.auth_uri.clone(),
        };

        // ring only parses the RSA structure when signing.
        signer
            .sign(Utc::now())
            .map_err(|e| CredentialError::NotRsa(e.to_string()))?;

        log::info!("[Signer] Loaded service-account key {}", signer.key_id);
        Ok(signer)
    }

    /// Mints a new assertion valid from `now` for [`ASSERTION_LIFETIME_SECS`].
    ///
    /// PSS padding is randomized, so two calls with the same `now` produce
    /// different tokens that both verify.
    pub fn sign(&self, now: DateTime<Utc>) -> Result<SignedAssertion, SignError> {
        let issued_at = now.timestamp();
        let expires_at = issued_at + ASSERTION_LIFETIME_SECS;

        let claims = AssertionClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: issued_at,
            exp: expires_at,
        };

        let mut header = Header::new(Algorithm::PS256);
        header.kid = Some(self.key_id.clone());

        let token = jsonwebtoken::encode(&header, &claims, &self.key)?;
        log::trace!("[Signer] Minted assertion expiring at {}", expires_at);

        Ok(SignedAssertion {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Wraps an already decoded key without the startup probe.
    #[cfg(test)]
    pub(crate) fn from_key(key: EncodingKey, key_id: &str, issuer: &str, audience: &str) -> Self {
        Self {
            key,
            key_id: key_id.to_string(),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    /// Key identifier placed in every assertion header.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

fn decode_private_key(pem: &str) -> Result<EncodingKey, CredentialError> {
    let mut reader = pem.as_bytes();
    let item = rustls_pemfile::read_one(&mut reader)
        .map_err(|e| CredentialError::MalformedPem(e.to_string()))?
        .ok_or_else(|| CredentialError::MalformedPem("no PEM block found".to_string()))?;

    match item {
        Item::Pkcs8Key(_) => {}
        Item::Pkcs1Key(_) => return Err(CredentialError::NotPkcs8("RSA PRIVATE KEY (PKCS#1)")),
        Item::Sec1Key(_) => return Err(CredentialError::NotPkcs8("EC PRIVATE KEY (SEC1)")),
        Item::X509Certificate(_) => return Err(CredentialError::NotPkcs8("CERTIFICATE")),
        _ => return Err(CredentialError::NotPkcs8("unsupported PEM section")),
    }

    EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| CredentialError::NotRsa(e.to_string()))
}
