//! Push Kit v3 send-message body.
//!
//! ```text
//! { "payload": { "notification": { category, title, body, image,
//!                                   badge: { addNum },
//!                                   clickAction: { actionType, data: { appid } } } },
//!   "target": { "token": [ device ] },
//!   "pushOptions": { "testMessage": false } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{BADGE_INCREMENT, CLICK_ACTION_OPEN_APP, PUSH_CATEGORY};

/// Complete request body for `/v3/{project}/messages:send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEnvelope {
    /// Notification content.
    pub payload: Payload,
    /// Destination devices.
    pub target: Target,
    /// Delivery options.
    pub push_options: PushOptions,
}

/// Wrapper around the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// The notification shown on the device.
    pub notification: Notification,
}

/// Notification shown on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Message category (controls notification channel on the device).
    pub category: String,
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Large icon URL. Empty when no icon was resolved.
    pub image: String,
    /// Badge update.
    pub badge: Badge,
    /// What happens when the notification is tapped.
    pub click_action: ClickAction,
}

/// Badge counter update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    /// Amount added to the current badge.
    pub add_num: u32,
    /// Absolute badge value. Omitted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_num: Option<u32>,
}

/// Tap action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickAction {
    /// Action type; `0` opens the app.
    pub action_type: u32,
    /// Extra data handed to the app, here `{"appid": <source>}`.
    pub data: BTreeMap<String, u32>,
}

/// Destination devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Device push tokens. The bridge always sends exactly one.
    pub token: Vec<String>,
}

/// Delivery options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOptions {
    /// Whether this is a test message.
    pub test_message: bool,
}

impl PushEnvelope {
    /// Builds the envelope for one forwarded Gotify message.
    pub fn new(
        title: &str,
        body: &str,
        icon_url: &str,
        source_id: u32,
        device_token: &str,
    ) -> Self {
        Self {
            payload: Payload {
                notification: Notification {
                    category: PUSH_CATEGORY.to_string(),
                    title: title.to_string(),
                    body: body.to_string(),
                    image: icon_url.to_string(),
                    badge: Badge {
                        add_num: BADGE_INCREMENT,
                        set_num: None,
                    },
                    click_action: ClickAction {
                        action_type: CLICK_ACTION_OPEN_APP,
                        data: BTreeMap::from([("appid".to_string(), source_id)]),
                    },
                },
            },
            target: Target {
                token: vec![device_token.to_string()],
            },
            push_options: PushOptions {
                test_message: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_matches_push_kit() {
        let envelope = PushEnvelope::new("T", "B", "I", 7, "device-1");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
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
            })
        );
    }

    #[test]
    fn test_decoding_encoded_envelope_is_structurally_equal() {
        let envelope = PushEnvelope::new("T", "B", "I", 7, "device-1");
        let text = serde_json::to_string(&envelope).unwrap();
        let decoded: PushEnvelope = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_set_num_serialized_when_present() {
        let mut envelope = PushEnvelope::new("T", "B", "", 1, "d");
        envelope.payload.notification.badge.set_num = Some(0);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["payload"]["notification"]["badge"]["setNum"], 0);
    }
}
