//! Gotify Harmony Bridge - forwards Gotify notifications to HarmonyOS.
//!
//! The bridge subscribes to a Gotify server's message stream and relays
//! every message to a single HarmonyOS device through Huawei Push Kit.
//!
//! # Architecture
//!
//! - **Stream** - WebSocket subscription with reconnect and backoff
//! - **Icons** - application icon cache, refreshed in bulk from Gotify
//! - **Signer** - PS256 service-account assertions for Push Kit
//! - **Push** - envelope construction and delivery
//! - **Bridge** - enable/disable lifecycle tying the pieces together
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from file and environment
//! - [`credential`] - Service-account credential file
//! - [`stream`] - Message stream consumer
//! - [`push`] - Push Kit delivery

// Library modules
pub mod bridge;
pub mod gotify;
pub mod icons;
pub mod push;
pub mod signer;
pub mod stream;
pub mod ws;

pub mod config;
pub mod constants;
pub mod credential;
pub mod error;

// Re-export commonly used types
pub use bridge::{Bridge, PushPipeline, PLUGIN_INFO};
pub use config::Config;
pub use credential::ServiceCredential;
pub use gotify::{Application, InboundEvent};
pub use icons::IconResolver;
pub use push::{DeliveryOutcome, PushDispatcher, PushEnvelope};
pub use signer::{CredentialSigner, SignedAssertion};
pub use stream::{ConnectionState, StreamConsumer};
