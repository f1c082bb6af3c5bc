//! Storage change subscriptions.
//!
//! Each `subscribe` call opens one transport subscription and spawns one
//! forwarder task that owns the delivery channel. The handle table is locked
//! only to register and release handles, never per notification.
//!
//! ```text
//! transport frames ──► forwarder(handle) ──► StorageSubscription::next()
//!                          ▲ stop
//!          unsubscribe / Drop
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use chainstate_core::types::{StorageChangeSet, StorageKey};
use futures::Stream;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{duration_ms, ClientConfig};
use crate::error::{SubscriptionError, TransportError};
use crate::transport::{SubscriptionId, Transport};

/// Process-local token identifying one storage subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a bounded wait on a subscription.
#[derive(Debug)]
pub enum Recv<T> {
    Item(T),
    /// The subscription ended: unsubscribed, or the transport closed it.
    Closed,
    /// The wait was cut short by a timeout or cancellation signal. The
    /// subscription is still open.
    Cancelled,
}

impl<T> Recv<T> {
    pub fn into_item(self) -> Option<T> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

type Delivery = Result<StorageChangeSet, SubscriptionError>;

struct Entry {
    keys: Vec<StorageKey>,
    transport_id: SubscriptionId,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    subscribe_method: String,
    unsubscribe_method: String,
    timeout: Duration,
    entries: Mutex<HashMap<u64, Entry>>,
    next_handle: AtomicU64,
}

impl Shared {
    async fn timed<T>(
        &self,
        fut: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| TransportError::Timeout {
                ms: duration_ms(self.timeout),
            })?
    }
}

/// Manages storage subscriptions over a shared transport.
///
/// Cheap to clone; clones share the handle table.
#[derive(Clone)]
pub struct SubscriptionManager {
    inner: Arc<Shared>,
}

impl SubscriptionManager {
    /// A manager using the default subscribe/unsubscribe methods.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, &ClientConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            inner: Arc::new(Shared {
                transport,
                subscribe_method: config.subscribe_method.clone(),
                unsubscribe_method: config.unsubscribe_method.clone(),
                timeout: config.request_timeout(),
                entries: Mutex::new(HashMap::new()),
                next_handle: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribe to changes of `keys`.
    ///
    /// Every call opens its own transport subscription, even for a key set
    /// that is already subscribed.
    pub async fn subscribe(
        &self,
        keys: Vec<StorageKey>,
    ) -> Result<StorageSubscription, SubscriptionError> {
        let params = vec![Value::Array(
            keys.iter().map(|k| Value::String(k.to_hex())).collect(),
        )];
        let sub = self
            .inner
            .timed(self.inner.transport.subscribe(&self.inner.subscribe_method, params))
            .await?;

        let handle = SubscriptionHandle(self.inner.next_handle.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        {
            // Held across the spawn: the forwarder's closure cleanup must
            // find the entry registered.
            let mut entries = self.inner.entries.lock();
            let task = tokio::spawn(forward(
                handle,
                sub.frames,
                stop_rx,
                tx,
                Arc::downgrade(&self.inner),
            ));
            entries.insert(
                handle.0,
                Entry {
                    keys: keys.clone(),
                    transport_id: sub.id.clone(),
                    stop: stop_tx,
                    task,
                },
            );
        }
        info!(%handle, transport_id = %sub.id, keys = keys.len(), "storage subscription opened");

        Ok(StorageSubscription {
            handle,
            keys,
            rx,
            manager: Arc::downgrade(&self.inner),
            released: false,
        })
    }

    /// Release `handle`: stop its forwarder, wait for it to exit, then close
    /// the transport subscription. Notifications that arrive afterwards are
    /// dropped.
    pub async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), SubscriptionError> {
        release(&self.inner, handle).await
    }

    /// Number of open subscriptions.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_active(&self, handle: SubscriptionHandle) -> bool {
        self.inner.entries.lock().contains_key(&handle.0)
    }

    /// Keys a handle was opened with.
    pub fn keys(&self, handle: SubscriptionHandle) -> Option<Vec<StorageKey>> {
        self.inner
            .entries
            .lock()
            .get(&handle.0)
            .map(|e| e.keys.clone())
    }
}

async fn release(shared: &Shared, handle: SubscriptionHandle) -> Result<(), SubscriptionError> {
    let entry = shared
        .entries
        .lock()
        .remove(&handle.0)
        .ok_or(SubscriptionError::UnknownHandle { handle: handle.0 })?;

    let _ = entry.stop.send(());
    if let Err(e) = entry.task.await {
        warn!(%handle, error = %e, "subscription forwarder failed");
    }
    shared
        .timed(
            shared
                .transport
                .unsubscribe(&shared.unsubscribe_method, &entry.transport_id),
        )
        .await?;
    info!(%handle, transport_id = %entry.transport_id, "storage subscription closed");
    Ok(())
}

/// Release from a synchronous context: stop the forwarder now and close the
/// transport subscription in the background.
fn release_detached(shared: &Shared, handle: SubscriptionHandle) {
    let Some(entry) = shared.entries.lock().remove(&handle.0) else {
        return;
    };
    let _ = entry.stop.send(());

    let transport = shared.transport.clone();
    let method = shared.unsubscribe_method.clone();
    let timeout = shared.timeout;
    let id = entry.transport_id;
    match tokio::runtime::Handle::try_current() {
        Ok(rt) => {
            rt.spawn(async move {
                match tokio::time::timeout(timeout, transport.unsubscribe(&method, &id)).await {
                    Ok(Ok(())) => info!(%handle, transport_id = %id, "storage subscription released"),
                    Ok(Err(e)) => warn!(%handle, error = %e, "failed to release storage subscription"),
                    Err(_) => warn!(%handle, "timed out releasing storage subscription"),
                }
            });
        }
        Err(_) => warn!(%handle, transport_id = %id, "no runtime to release storage subscription"),
    }
}

async fn forward(
    handle: SubscriptionHandle,
    mut frames: mpsc::UnboundedReceiver<Value>,
    mut stop: oneshot::Receiver<()>,
    tx: mpsc::UnboundedSender<Delivery>,
    shared: Weak<Shared>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => {
                debug!(%handle, "subscription forwarder stopped");
                return;
            }
            frame = frames.recv() => match frame {
                Some(frame) => {
                    let item = serde_json::from_value::<StorageChangeSet>(frame).map_err(|e| {
                        warn!(%handle, error = %e, "malformed storage notification");
                        SubscriptionError::MalformedFrame {
                            handle: handle.0,
                            reason: e.to_string(),
                        }
                    });
                    if let Ok(set) = &item {
                        debug!(%handle, block = %set.block, changes = set.len(), "storage change-set");
                    }
                    if tx.send(item).is_err() {
                        return;
                    }
                }
                None => {
                    warn!(%handle, "transport closed storage subscription");
                    if let Some(shared) = shared.upgrade() {
                        shared.entries.lock().remove(&handle.0);
                    }
                    return;
                }
            },
        }
    }
}

/// A live storage subscription.
///
/// Dropping the guard releases the subscription, so an early return, an
/// error or a timeout in the consumer never leaks a handle.
pub struct StorageSubscription {
    handle: SubscriptionHandle,
    keys: Vec<StorageKey>,
    rx: mpsc::UnboundedReceiver<Delivery>,
    manager: Weak<Shared>,
    released: bool,
}

impl StorageSubscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    pub fn keys(&self) -> &[StorageKey] {
        &self.keys
    }

    /// Wait for the next change-set; `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    /// Like [`StorageSubscription::next`], giving up after `timeout`.
    pub async fn next_timeout(&mut self, timeout: Duration) -> Recv<Delivery> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(item)) => Recv::Item(item),
            Ok(None) => Recv::Closed,
            Err(_) => Recv::Cancelled,
        }
    }

    /// Like [`StorageSubscription::next`], giving up when `cancel` completes.
    pub async fn next_until<F>(&mut self, cancel: F) -> Recv<Delivery>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            item = self.rx.recv() => match item {
                Some(item) => Recv::Item(item),
                None => Recv::Closed,
            },
            _ = cancel => Recv::Cancelled,
        }
    }

    /// Release the subscription and wait until the transport has closed it.
    pub async fn unsubscribe(mut self) -> Result<(), SubscriptionError> {
        self.released = true;
        match self.manager.upgrade() {
            Some(shared) => release(&shared, self.handle).await,
            None => Err(SubscriptionError::UnknownHandle {
                handle: self.handle.0,
            }),
        }
    }
}

impl Stream for StorageSubscription {
    type Item = Delivery;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for StorageSubscription {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.manager.upgrade() {
            Some(shared) => release_detached(&shared, self.handle),
            None => warn!(
                handle = %self.handle,
                "subscription manager dropped; transport subscription not released"
            ),
        }
    }
}

impl std::fmt::Debug for StorageSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSubscription")
            .field("handle", &self.handle)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
