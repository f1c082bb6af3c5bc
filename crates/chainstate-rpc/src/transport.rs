//! The `Transport` trait: the narrow interface to the node connection.
//!
//! Connection lifecycle (dialing, reconnecting, framing) belongs to the
//! implementation. The rest of this crate only needs request/response calls
//! and a stream of notification payloads per subscription.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// A subscription id assigned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

impl From<String> for SubscriptionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open transport-level subscription.
#[derive(Debug)]
pub struct TransportSubscription {
    pub id: SubscriptionId,
    /// The `result` payload of each notification, in arrival order. The
    /// channel closes when the transport drops the subscription.
    pub frames: mpsc::UnboundedReceiver<Value>,
}

/// The async trait every node transport implements.
///
/// # Object Safety
/// The trait is object-safe and is stored as `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Open a subscription with `method` (e.g. `state_subscribeStorage`).
    async fn subscribe(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<TransportSubscription, TransportError>;

    /// Close a subscription with `method` (e.g. `state_unsubscribeStorage`).
    async fn unsubscribe(&self, method: &str, id: &SubscriptionId) -> Result<(), TransportError>;

    /// The transport's identifier (URL or name).
    fn url(&self) -> &str;

    /// Call a method and return its `result`, mapping node errors to
    /// [`TransportError::Rpc`].
    async fn call(&self, id: u64, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let req = JsonRpcRequest::new(id, method, params);
        let resp = self.send(req).await?;
        resp.into_result().map_err(TransportError::Rpc)
    }
}
