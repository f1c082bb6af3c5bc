#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chainstate_core::types::{to_hex, BlockHash, StorageKey};
use chainstate_rpc::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, SubscriptionId, Transport, TransportError,
    TransportSubscription,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;

// ─── Mock transport ──────────────────────────────────────────────────────────

/// In-memory node: canned results per method, storage per key, and
/// subscriptions whose frames the test pushes by hand.
#[derive(Default)]
pub struct MockTransport {
    results: Mutex<HashMap<String, Value>>,
    errors: Mutex<HashMap<String, JsonRpcError>>,
    storage: Mutex<HashMap<String, Value>>,
    hanging: Mutex<HashSet<String>>,
    subs: Mutex<HashMap<String, mpsc::UnboundedSender<Value>>>,
    next_sub: AtomicU64,
    pub requests: Mutex<Vec<JsonRpcRequest>>,
    pub subscribe_calls: Mutex<Vec<(String, Vec<Value>)>>,
    pub unsubscribe_calls: Mutex<Vec<(String, SubscriptionId)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: &str, result: Value) {
        self.results.lock().insert(method.to_string(), result);
    }

    pub fn fail(&self, method: &str, code: i64, message: &str) {
        self.errors.lock().insert(
            method.to_string(),
            JsonRpcError {
                code,
                message: message.to_string(),
                data: None,
            },
        );
    }

    /// Calls to `method` never complete.
    pub fn hang(&self, method: &str) {
        self.hanging.lock().insert(method.to_string());
    }

    pub fn put_storage(&self, key: &StorageKey, data: &[u8]) {
        self.storage.lock().insert(key.to_hex(), Value::String(to_hex(data)));
    }

    /// Deliver a notification on subscription `id`. Returns `false` if the
    /// subscription was closed by [`MockTransport::close`].
    pub fn push(&self, id: &str, frame: Value) -> bool {
        match self.subs.lock().get(id) {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    /// Drop the frame sender, as a node does when it ends a subscription.
    pub fn close(&self, id: &str) {
        self.subs.lock().remove(id);
    }

    pub fn requests_for(&self, method: &str) -> Vec<JsonRpcRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribe_calls
            .lock()
            .iter()
            .map(|(_, id)| id.0.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        self.requests.lock().push(req.clone());
        let hang = self.hanging.lock().contains(&req.method);
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.errors.lock().get(&req.method) {
            return Ok(JsonRpcResponse::failure(req.id, err.clone()));
        }
        let result = if req.method == "state_getStorage" {
            let key = req.params.first().and_then(Value::as_str).unwrap_or_default();
            self.storage.lock().get(key).cloned().unwrap_or(Value::Null)
        } else {
            self.results.lock().get(&req.method).cloned().unwrap_or(Value::Null)
        };
        Ok(JsonRpcResponse::success(req.id, result))
    }

    async fn subscribe(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<TransportSubscription, TransportError> {
        let hang = self.hanging.lock().contains(method);
        if hang {
            std::future::pending::<()>().await;
        }
        self.subscribe_calls.lock().push((method.to_string(), params));
        let n = self.next_sub.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("sub-{n}");
        let (tx, frames) = mpsc::unbounded_channel();
        self.subs.lock().insert(id.clone(), tx);
        Ok(TransportSubscription {
            id: SubscriptionId(id),
            frames,
        })
    }

    async fn unsubscribe(&self, method: &str, id: &SubscriptionId) -> Result<(), TransportError> {
        // Sender stays open; frames in flight can still arrive.
        self.unsubscribe_calls.lock().push((method.to_string(), id.clone()));
        Ok(())
    }

    fn url(&self) -> &str {
        "mock://node"
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

pub fn block(n: u8) -> BlockHash {
    BlockHash([n; 32])
}

/// A `state_storage` notification payload.
pub fn change_set(at: BlockHash, changes: &[(&StorageKey, Option<&[u8]>)]) -> Value {
    let changes: Vec<Value> = changes
        .iter()
        .map(|&(key, data)| json!([key.to_hex(), data.map(to_hex)]))
        .collect();
    json!({ "block": at.to_hex(), "changes": changes })
}

/// Poll `cond` until it holds or a second has passed.
pub async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), fut)
        .await
        .expect("operation did not complete in time")
}
