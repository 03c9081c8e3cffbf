//! Huawei Push Kit delivery.
//!
//! # Architecture
//!
//! ```text
//! Gotify message (title, body, appid) + resolved icon URL
//!     ↓
//! PushEnvelope (category ACCOUNT, badge +1, click → open app)
//!     ↓
//! PushDispatcher signs a fresh PS256 assertion
//!     ↓
//! POST {push_api_url}/v3/{project_id}/messages:send
//!     ↓
//! DeliveryOutcome (logged, never retried)
//! ```

// Rust guideline compliant 2026-02

pub mod dispatcher;
pub mod envelope;

pub use dispatcher::{DeliveryOutcome, PushDispatcher};
pub use envelope::PushEnvelope;
