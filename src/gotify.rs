//! Gotify wire types.
//!
//! Only the fields the bridge reads are required; anything else in the
//! server's JSON is ignored.

use serde::{Deserialize, Serialize};

/// A message pushed by the Gotify `/stream` WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Message id.
    pub id: u32,
    /// Id of the application that posted the message.
    pub appid: u32,
    /// Message body.
    pub message: String,
    /// Message title.
    #[serde(default)]
    pub title: String,
    /// Message priority.
    #[serde(default)]
    pub priority: u32,
    /// Creation time as sent by the server (RFC 3339).
    #[serde(default)]
    pub date: String,
}

impl InboundEvent {
    /// Decodes one stream frame.
    pub fn from_frame(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// One entry of the Gotify `/application` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Application id.
    pub id: u32,
    /// Image path relative to the server root, e.g. `image/abc.png`.
    /// Absent or `null` when the server has none on record.
    #[serde(default)]
    pub image: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Priority applied when a message does not set one.
    #[serde(default)]
    pub default_priority: u32,
    /// Whether the application is internal to the server.
    #[serde(default)]
    pub internal: bool,
    /// Last time the application posted.
    #[serde(default)]
    pub last_used: Option<String>,
}
