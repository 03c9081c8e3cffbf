//! Push Kit message delivery.
//!
//! Every dispatch signs a fresh assertion, posts one [`PushEnvelope`] and
//! reports a [`DeliveryOutcome`]. Nothing here returns an error: failures
//! are logged and handed back as an outcome so the stream consumer never
//! stops because of a provider problem. Nothing is retried.

// Rust guideline compliant 2026-02

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use crate::constants::{LOGGED_TOKEN_PREFIX_LEN, PUSH_TYPE_HEADER_VALUE};
use crate::error::{ConfigError, StartupError};
use crate::signer::CredentialSigner;

use super::envelope::PushEnvelope;

/// Result of one push attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Provider answered HTTP 200.
    Delivered,
    /// Provider answered with another status.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },
    /// Request never got a response (connect error, timeout, …).
    TransportFailed(String),
    /// No assertion could be signed, so nothing was sent.
    SigningFailed(String),
}

impl DeliveryOutcome {
    /// Whether the provider accepted the message.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivered => write!(f, "delivered"),
            Self::Rejected { status, .. } => write!(f, "rejected (HTTP {status})"),
            Self::TransportFailed(e) => write!(f, "transport failure: {e}"),
            Self::SigningFailed(e) => write!(f, "signing failure: {e}"),
        }
    }
}

/// Push Kit reply body. Only used for logging.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderReply {
    #[serde(default)]
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    request_id: String,
}

/// Sends notifications to the single paired device.
#[derive(Debug, Clone)]
pub struct PushDispatcher {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    device_token: String,
    signer: CredentialSigner,
}

impl PushDispatcher {
    /// Creates a dispatcher posting to `{push_api_url}/v3/{project_id}/messages:send`.
    pub fn new(
        push_api_url: &str,
        project_id: &str,
        device_token: impl Into<String>,
        signer: CredentialSigner,
        timeout: Duration,
    ) -> Result<Self, StartupError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, push_api_url, project_id, device_token, signer)
    }

    /// Same as [`Self::new`] but reuses an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        push_api_url: &str,
        project_id: &str,
        device_token: impl Into<String>,
        signer: CredentialSigner,
    ) -> Result<Self, StartupError> {
        let endpoint = send_endpoint(push_api_url, project_id)?;
        Ok(Self {
            client,
            endpoint,
            device_token: device_token.into(),
            signer,
        })
    }

    /// The send-message URL this dispatcher posts to.
    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }

    /// Builds, signs and sends one notification. Never fails; see [`DeliveryOutcome`].
    pub async fn dispatch(
        &self,
        title: &str,
        body: &str,
        icon_url: &str,
        source_id: u32,
    ) -> DeliveryOutcome {
        let envelope = PushEnvelope::new(title, body, icon_url, source_id, &self.device_token);
        let outcome = self.send(&envelope).await;

        if outcome.is_success() {
            log::info!("[Push] Message from app {} forwarded to device", source_id);
        } else {
            log::warn!(
                "[Push] Message from app {} not forwarded: {}",
                source_id,
                outcome
            );
        }
        outcome
    }

    async fn send(&self, envelope: &PushEnvelope) -> DeliveryOutcome {
        let assertion = match self.signer.sign(Utc::now()) {
            Ok(assertion) => assertion,
            Err(e) => {
                log::error!("[Push] {}", e);
                return DeliveryOutcome::SigningFailed(e.to_string());
            }
        };

        let body = match serde_json::to_string(envelope) {
            Ok(body) => body,
            Err(e) => {
                log::error!("[Push] Failed to encode envelope: {}", e);
                return DeliveryOutcome::TransportFailed(e.to_string());
            }
        };

        log::debug!("[Push] ============== Request ==============");
        log::debug!("[Push] POST {}", self.endpoint);
        log::debug!("[Push] Content-Type: application/json");
        log::debug!(
            "[Push] Authorization: Bearer {}…",
            &assertion.token[..assertion.token.len().min(LOGGED_TOKEN_PREFIX_LEN)]
        );
        log::debug!("[Push] push-type: {}", PUSH_TYPE_HEADER_VALUE);
        log::debug!("[Push] {}", body);

        let response = match self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::AUTHORIZATION, assertion.bearer())
            .header("push-type", PUSH_TYPE_HEADER_VALUE)
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::debug!("[Push] ============== No response ==============");
                log::debug!("[Push] {}", e);
                return DeliveryOutcome::TransportFailed(e.to_string());
            }
        };

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        log::debug!("[Push] ============== Response ==============");
        log::debug!("[Push] HTTP {}", status);
        log::debug!("[Push] {}", text);
        if let Ok(reply) = serde_json::from_str::<ProviderReply>(&text) {
            log::debug!(
                "[Push] Provider code={} msg={} request={}",
                reply.code,
                reply.msg,
                reply.request_id
            );
        }

        if status == 200 {
            DeliveryOutcome::Delivered
        } else {
            DeliveryOutcome::Rejected { status, body: text }
        }
    }
}

fn send_endpoint(push_api_url: &str, project_id: &str) -> Result<reqwest::Url, ConfigError> {
    let url = format!(
        "{}/v3/{}/messages:send",
        push_api_url.trim_end_matches('/'),
        project_id
    );
    reqwest::Url::parse(&url).map_err(|e| ConfigError::Invalid {
        name: "push_api_url",
        reason: format!("{url}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::ServiceCredential;
    use wiremock::matchers::{body_json, header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSA_PKCS8: &str = include_str!("../../tests/fixtures/rsa_pkcs8.pem");

    fn signer() -> CredentialSigner {
        CredentialSigner::new(&ServiceCredential {
            project_id: "proj-1".to_string(),
            key_id: "kid-1".to_string(),
            private_key: RSA_PKCS8.to_string(),
            sub_account: "acct".to_string(),
            auth_uri: "https://oauth.example.com/token".to_string(),
            token_uri: String::new(),
            auth_provider_cert_uri: String::new(),
            client_cert_uri: String::new(),
        })
        .expect("fixture key is valid")
    }

    fn dispatcher(base: &str) -> PushDispatcher {
        PushDispatcher::new(base, "proj-1", "device-1", signer(), Duration::from_secs(2))
            .expect("dispatcher")
    }

    #[test]
    fn test_send_endpoint_format() {
        let url = send_endpoint("https://push-api.cloud.huawei.com/", "388421841222199046").unwrap();
        assert_eq!(
            url.as_str(),
            "https://push-api.cloud.huawei.com/v3/388421841222199046/messages:send"
        );
    }

    #[tokio::test]
    async fn test_http_200_is_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/proj-1/messages:send"))
            .and(header("content-type", "application/json"))
            .and(header("push-type", "0"))
            .and(header_regex("authorization", r"^Bearer [\w-]+\.[\w-]+\.[\w-]+$"))
            .and(body_json(serde_json::json!({
                "payload": { "notification": {
                    "category": "ACCOUNT",
                    "title": "T",
                    "body": "B",
                    "image": "I",
                    "badge": { "addNum": 1 },
                    "clickAction": { "actionType": 0, "data": { "appid": 7 } }
                }},
                "target": { "token": ["device-1"] },
                "pushOptions": { "testMessage": false }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"code":"80000000","msg":"Success","requestId":"r1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = dispatcher(&server.uri()).dispatch("T", "B", "I", 7).await;
        assert_eq!(outcome, DeliveryOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_http_500_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let outcome = dispatcher(&server.uri()).dispatch("T", "B", "", 1).await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Rejected {
                status: 500,
                body: "boom".to_string()
            }
        );
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let outcome = dispatcher(&server.uri()).dispatch("T", "B", "", 1).await;
        assert!(matches!(outcome, DeliveryOutcome::Rejected { status: 202, .. }));
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let outcome = dispatcher("http://127.0.0.1:1").dispatch("T", "B", "", 1).await;
        assert!(matches!(outcome, DeliveryOutcome::TransportFailed(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let dispatcher = PushDispatcher::new(
            &server.uri(),
            "proj-1",
            "device-1",
            signer(),
            Duration::from_millis(200),
        )
        .unwrap();
        let outcome = dispatcher.dispatch("T", "B", "", 1).await;
        assert!(matches!(outcome, DeliveryOutcome::TransportFailed(_)));
    }

    #[tokio::test]
    async fn test_signing_failure_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        // An HMAC secret cannot produce a PS256 signature.
        let signer = CredentialSigner::from_key(
            jsonwebtoken::EncodingKey::from_secret(b"not-an-rsa-key"),
            "kid-1",
            "acct",
            "https://oauth.example.com/token",
        );
        let dispatcher = PushDispatcher::new(
            &server.uri(),
            "proj-1",
            "device-1",
            signer,
            Duration::from_secs(2),
        )
        .unwrap();

        let outcome = dispatcher.dispatch("T", "B", "", 1).await;
        assert!(matches!(outcome, DeliveryOutcome::SigningFailed(_)));
        assert!(!outcome.is_success());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_each_dispatch_mints_a_new_assertion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let dispatcher = dispatcher(&server.uri());
        dispatcher.dispatch("T", "B", "", 1).await;
        dispatcher.dispatch("T", "B", "", 1).await;

        let requests = server.received_requests().await.unwrap();
        let auth: Vec<_> = requests
            .iter()
            .map(|r| r.headers.get("authorization").unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(auth.len(), 2);
        assert_ne!(auth[0], auth[1]);
    }
}
