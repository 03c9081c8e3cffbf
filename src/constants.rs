//! Application-wide constants for the bridge.
//!
//! Centralizes provider wire constants, network timeouts and reconnect
//! bounds so they can be found in one place.
//!
//! # Categories
//!
//! - **Timeouts**: Network and handshake timeouts
//! - **Reconnect**: Stream reconnection backoff
//! - **Assertions**: Service-account token lifetime
//! - **Push provider**: Fixed values of the send-message request

use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

/// Default HTTP request timeout for registry fetches and push sends.
///
/// Every outbound call is bounded so a stalled remote endpoint cannot hold
/// the single consumer task indefinitely.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on the WebSocket handshake with the Gotify server.
pub const STREAM_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Reconnect
// ============================================================================

/// First delay after a failed connect or a dropped stream.
pub const RECONNECT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Ceiling for the doubling reconnect delay.
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(60);

// ============================================================================
// Assertions
// ============================================================================

/// Lifetime of a signed service-account assertion, in seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 300;

// ============================================================================
// Push provider
// ============================================================================

/// Default Push Kit API host.
pub const DEFAULT_PUSH_API_URL: &str = "https://push-api.cloud.huawei.com";

/// Notification category sent with every push.
pub const PUSH_CATEGORY: &str = "ACCOUNT";

/// Value of the `push-type` header (0 = notification message).
pub const PUSH_TYPE_HEADER_VALUE: &str = "0";

/// Click action type: open the app's home page.
pub const CLICK_ACTION_OPEN_APP: u32 = 0;

/// Badge increment applied per delivered notification.
pub const BADGE_INCREMENT: u32 = 1;

/// Characters of the bearer assertion kept when logging requests.
pub const LOGGED_TOKEN_PREFIX_LEN: usize = 12;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_values_are_reasonable() {
        assert!(HTTP_REQUEST_TIMEOUT >= Duration::from_secs(5));
        assert!(HTTP_REQUEST_TIMEOUT <= Duration::from_secs(60));
        assert!(STREAM_HANDSHAKE_TIMEOUT >= Duration::from_secs(1));
    }

    #[test]
    fn test_reconnect_bounds_ordering() {
        assert!(RECONNECT_INITIAL_DELAY < RECONNECT_MAX_DELAY);
    }

    #[test]
    fn test_assertion_lifetime_is_five_minutes() {
        assert_eq!(ASSERTION_LIFETIME_SECS, 300);
    }
}
