//! Bridge lifecycle.
//!
//! Wires configuration and the service credential into the stream consumer
//! and starts/stops it. [`PushPipeline`] is the sink the consumer feeds:
//! icon lookup followed by a push dispatch, one event at a time.

// Rust guideline compliant 2026-02

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::credential::ServiceCredential;
use crate::error::StartupError;
use crate::gotify::InboundEvent;
use crate::icons::IconResolver;
use crate::push::{DeliveryOutcome, PushDispatcher};
use crate::signer::CredentialSigner;
use crate::stream::{ConnectionState, ConsumerConfig, EventSink, StreamConsumer};

/// Identity of the bridge, logged on enable.
#[derive(Debug, Clone, Copy)]
pub struct PluginInfo {
    /// Display name.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Package version.
    pub version: &'static str,
    /// License identifier.
    pub license: &'static str,
}

/// This build's identity.
pub const PLUGIN_INFO: PluginInfo = PluginInfo {
    name: "GotifyHarmonyBridge",
    description: env!("CARGO_PKG_DESCRIPTION"),
    version: env!("CARGO_PKG_VERSION"),
    license: env!("CARGO_PKG_LICENSE"),
};

/// Resolves the icon for each event and forwards it to Push Kit.
#[derive(Debug)]
pub struct PushPipeline {
    icons: IconResolver,
    dispatcher: PushDispatcher,
}

impl PushPipeline {
    /// Creates a pipeline from its two stages.
    pub fn new(icons: IconResolver, dispatcher: PushDispatcher) -> Self {
        Self { icons, dispatcher }
    }

    /// Forwards one event and returns how delivery went.
    pub async fn handle(&mut self, event: &InboundEvent) -> DeliveryOutcome {
        let icon = self.icons.resolve(event.appid).await;
        self.dispatcher
            .dispatch(&event.title, &event.message, &icon, event.appid)
            .await
    }

    /// The icon cache, for inspection.
    pub fn icons(&self) -> &IconResolver {
        &self.icons
    }
}

#[async_trait]
impl EventSink for PushPipeline {
    async fn forward(&mut self, event: InboundEvent) {
        // Outcome is already logged by the dispatcher.
        let _outcome = self.handle(&event).await;
    }
}

/// A running consumer task.
#[derive(Debug)]
struct Running {
    cancel: CancellationToken,
    task: JoinHandle<PushPipeline>,
    state: watch::Receiver<ConnectionState>,
}

/// Owns the bridge configuration and the consumer task.
#[derive(Debug)]
pub struct Bridge {
    config: Config,
    project_id: String,
    signer: CredentialSigner,
    client: reqwest::Client,
    running: Option<Running>,
}

impl Bridge {
    /// Validates the signing key and prepares the shared HTTP client.
    ///
    /// Any error here is a startup failure.
    pub fn new(config: Config, credential: &ServiceCredential) -> Result<Self, StartupError> {
        let signer = CredentialSigner::new(credential)?;
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            config,
            project_id: credential.project_id.clone(),
            signer,
            client,
            running: None,
        })
    }

    /// Loads the credential file named in `config` and calls [`Self::new`].
    pub fn from_config(config: Config) -> Result<Self, StartupError> {
        let credential = ServiceCredential::load(&config.credential_path)?;
        Self::new(config, &credential)
    }

    /// Builds a fresh pipeline (empty icon cache) from the configuration.
    pub fn pipeline(&self) -> Result<PushPipeline, StartupError> {
        let icons = IconResolver::with_client(
            self.client.clone(),
            self.config.registry_url()?,
            self.config.gotify_url.clone(),
        );
        let dispatcher = PushDispatcher::with_client(
            self.client.clone(),
            &self.config.push_api_url,
            &self.project_id,
            self.config.device_token.clone(),
            self.signer.clone(),
        )?;
        Ok(PushPipeline::new(icons, dispatcher))
    }

    /// Starts the stream consumer. Calling it while running is a no-op.
    pub fn enable(&mut self) -> Result<(), StartupError> {
        if self.running.is_some() {
            return Ok(());
        }

        let consumer_config = ConsumerConfig {
            initial_backoff: self.config.reconnect_initial(),
            max_backoff: self.config.reconnect_max(),
            ..ConsumerConfig::new(self.config.stream_url()?)
        };
        let consumer = StreamConsumer::new(consumer_config, self.pipeline()?);
        let state = consumer.state();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(consumer.run(cancel.clone()));

        log::info!(
            "[Bridge] {} v{} enabled",
            PLUGIN_INFO.name,
            PLUGIN_INFO.version
        );
        self.running = Some(Running {
            cancel,
            task,
            state,
        });
        Ok(())
    }

    /// Stops the consumer and waits for it to exit.
    ///
    /// An event already being forwarded finishes first; its HTTP calls are
    /// bounded by the configured timeout.
    pub async fn disable(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.cancel.cancel();
        match running.task.await {
            Ok(pipeline) => log::info!(
                "[Bridge] Disabled ({} cached icons dropped)",
                pipeline.icons().len()
            ),
            Err(e) => log::error!("[Bridge] Consumer task ended abnormally: {}", e),
        }
    }

    /// Whether the consumer task is running.
    pub fn is_enabled(&self) -> bool {
        self.running.is_some()
    }

    /// Current stream state (`Disconnected` when not enabled).
    pub fn state(&self) -> ConnectionState {
        self.running
            .as_ref()
            .map_or(ConnectionState::Disconnected, |r| *r.state.borrow())
    }

    /// Watches stream state while enabled.
    pub fn watch_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.running.as_ref().map(|r| r.state.clone())
    }

    /// The signer built from the service credential.
    pub fn signer(&self) -> &CredentialSigner {
        &self.signer
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const RSA_PKCS8: &str = include_str!("../tests/fixtures/rsa_pkcs8.pem");
    const EC_PKCS8: &str = include_str!("../tests/fixtures/ec_pkcs8.pem");

    fn credential(private_key: &str) -> ServiceCredential {
        ServiceCredential {
            project_id: "proj-1".to_string(),
            key_id: "kid-1".to_string(),
            private_key: private_key.to_string(),
            sub_account: "acct".to_string(),
            auth_uri: "https://oauth.example.com/token".to_string(),
            token_uri: String::new(),
            auth_provider_cert_uri: String::new(),
            client_cert_uri: String::new(),
        }
    }

    fn config() -> Config {
        Config {
            device_token: "device-1".to_string(),
            gotify_port: 1,
            gotify_token: "Ctok".to_string(),
            reconnect_initial_ms: 10,
            reconnect_max_ms: 20,
            ..Config::default()
        }
    }

    #[test]
    fn test_plugin_info_from_package() {
        assert_eq!(PLUGIN_INFO.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(PLUGIN_INFO.license, "MIT");
    }

    #[test]
    fn test_bad_key_is_startup_error() {
        let err = Bridge::new(config(), &credential(EC_PKCS8)).unwrap_err();
        assert!(matches!(err, StartupError::Credential(_)));
    }

    #[test]
    fn test_missing_credential_file_is_startup_error() {
        let config = Config {
            credential_path: "/nonexistent/private.json".into(),
            ..config()
        };
        let err = Bridge::from_config(config).unwrap_err();
        assert!(matches!(err, StartupError::Config(_)));
    }

    #[test]
    fn test_pipeline_targets_project_endpoint() {
        let bridge = Bridge::new(config(), &credential(RSA_PKCS8)).unwrap();
        let pipeline = bridge.pipeline().unwrap();
        assert_eq!(
            pipeline.dispatcher.endpoint().as_str(),
            "https://push-api.cloud.huawei.com/v3/proj-1/messages:send"
        );
        assert!(pipeline.icons().is_empty());
    }

    #[tokio::test]
    async fn test_enable_disable_with_unreachable_server() {
        let mut bridge = Bridge::new(config(), &credential(RSA_PKCS8)).unwrap();
        assert!(!bridge.is_enabled());
        assert_eq!(bridge.state(), ConnectionState::Disconnected);

        assert!(bridge.watch_state().is_none());

        bridge.enable().unwrap();
        assert!(bridge.is_enabled());
        bridge.enable().unwrap();

        let mut state = bridge.watch_state().expect("enabled bridge exposes state");
        // The consumer cycles Connecting/Disconnected against a closed port.
        tokio::time::timeout(Duration::from_secs(2), state.changed())
            .await
            .expect("consumer should attempt a connection")
            .expect("state sender alive");
        assert_ne!(*state.borrow(), ConnectionState::Connected);

        tokio::time::timeout(Duration::from_secs(2), bridge.disable())
            .await
            .expect("disable should be prompt");
        assert!(!bridge.is_enabled());
        assert!(bridge.watch_state().is_none());
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
    }
}
