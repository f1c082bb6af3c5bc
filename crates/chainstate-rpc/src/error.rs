//! Transport, subscription and client error types.

use chainstate_core::error::{DecodeError, EventDecodeError, MetadataError, StorageKeyError};
use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur during a transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket connection/send/receive error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The connection is gone and will not come back.
    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// Returns `true` if this error is transient and the request may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::WebSocket(_) | Self::Timeout { .. })
    }

    /// Returns `true` if the node rejected the request itself.
    pub fn is_rpc_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

/// Errors from the storage subscription pipeline.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Unknown subscription handle {handle}")]
    UnknownHandle { handle: u64 },

    /// A notification could not be parsed as a storage change-set. The
    /// subscription stays open.
    #[error("Malformed notification on subscription {handle}: {reason}")]
    MalformedFrame { handle: u64, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Umbrella error for [`crate::state::StateClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    StorageKey(#[from] StorageKeyError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Events(#[from] EventDecodeError),
}

impl ClientError {
    /// Returns `true` if the failure is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) | Self::Subscription(SubscriptionError::Transport(e)) => {
                e.is_retryable()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(TransportError::Timeout { ms: 100 }.is_retryable());
        assert!(!TransportError::Closed.is_retryable());
        let rpc = TransportError::Rpc(JsonRpcError {
            code: -32602,
            message: "invalid params".into(),
            data: None,
        });
        assert!(rpc.is_rpc_error());
        assert!(!rpc.is_retryable());
        assert_eq!(rpc.to_string(), "RPC error -32602: invalid params");
    }

    #[test]
    fn every_transport_error_is_classified() {
        let all = [
            TransportError::WebSocket("reset".into()),
            TransportError::Timeout { ms: u64::MAX },
            TransportError::Closed,
        ];
        for err in &all {
            // Exhaustive: a new variant must be classified here.
            let expected = match err {
                TransportError::WebSocket(_) | TransportError::Timeout { .. } => true,
                TransportError::Rpc(_)
                | TransportError::Deserialization(_)
                | TransportError::Closed => false,
            };
            assert_eq!(err.is_retryable(), expected, "{err}");
        }
        assert_eq!(
            all[1].to_string(),
            format!("Request timed out after {}ms", u64::MAX)
        );
    }

    #[test]
    fn client_error_wraps_transport() {
        let err: ClientError = TransportError::Timeout { ms: 5 }.into();
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "Request timed out after 5ms");

        let err: ClientError = SubscriptionError::UnknownHandle { handle: 3 }.into();
        assert!(!err.is_retryable());
    }
}
