//! Gotify message stream consumption.
//!
//! One long-lived task owns the WebSocket subscription, decodes each frame
//! into an [`InboundEvent`](crate::gotify::InboundEvent) and hands it to an
//! [`EventSink`] before reading the next one.
//!
//! # State machine
//!
//! ```text
//!             start / retry delay elapsed
//! Disconnected ──────────────────────────► Connecting
//!      ▲                                       │ handshake ok
//!      │ read/decode error, close, shutdown    ▼
//!      └─────────────────────────────────── Connected
//! ```
//!
//! Delivery is at-most-once: there is no resume position, so frames sent
//! while disconnected are lost.

// Rust guideline compliant 2026-02

pub mod consumer;

pub use consumer::{ConnectionState, ConsumerConfig, EventSink, StreamConsumer};
