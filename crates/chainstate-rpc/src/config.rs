//! Client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`crate::state::StateClient`] and its subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Upper bound for every request, subscribe and unsubscribe call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Method used to open storage subscriptions
    #[serde(default = "default_subscribe_method")]
    pub subscribe_method: String,
    /// Method used to close storage subscriptions
    #[serde(default = "default_unsubscribe_method")]
    pub unsubscribe_method: String,
}

fn default_request_timeout_ms() -> u64 { 30_000 }
fn default_subscribe_method() -> String { "state_subscribeStorage".into() }
fn default_unsubscribe_method() -> String { "state_unsubscribeStorage".into() }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            subscribe_method: default_subscribe_method(),
            unsubscribe_method: default_unsubscribe_method(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = duration_ms(timeout);
        self
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
