//! Typed access to the node's `state_*` and `chain_*` methods.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chainstate_core::types::{from_hex, BlockHash, StorageData, StorageKey};
use chainstate_metadata::{EventDecoder, EventRecord, MetadataIndex, StorageKeyDeriver};
use chainstate_scale::Value;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use tracing::{debug, info};

use crate::config::{duration_ms, ClientConfig};
use crate::error::{ClientError, TransportError};
use crate::subscriptions::{Recv, StorageSubscription, SubscriptionHandle, SubscriptionManager};
use crate::transport::Transport;
use crate::types::{Header, RuntimeVersion, SignedBlock};

/// Client for storage queries and subscriptions against one node.
pub struct StateClient {
    transport: Arc<dyn Transport>,
    subscriptions: SubscriptionManager,
    config: ClientConfig,
    next_id: AtomicU64,
}

fn at_param(at: Option<BlockHash>) -> Option<Json> {
    at.map(|h| Json::String(h.to_hex()))
}

impl StateClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        let subscriptions = SubscriptionManager::with_config(transport.clone(), &config);
        Self {
            transport,
            subscriptions,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Json>,
    ) -> Result<T, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timeout = self.config.request_timeout();
        let result = tokio::time::timeout(timeout, self.transport.call(id, method, params))
            .await
            .map_err(|_| TransportError::Timeout {
                ms: duration_ms(timeout),
            })??;
        debug!(id, method, "rpc call completed");
        serde_json::from_value(result)
            .map_err(|e| ClientError::Transport(TransportError::Deserialization(e)))
    }

    /// Fetch and parse the runtime metadata, at the best block or at `at`.
    pub async fn metadata(&self, at: Option<BlockHash>) -> Result<Arc<MetadataIndex>, ClientError> {
        let hex: String = self
            .request("state_getMetadata", at_param(at).into_iter().collect())
            .await?;
        let raw = from_hex(&hex)?;
        let meta = MetadataIndex::parse(&raw)?;
        info!(
            version = meta.version(),
            modules = meta.modules().len(),
            bytes = raw.len(),
            "fetched runtime metadata"
        );
        Ok(Arc::new(meta))
    }

    pub async fn runtime_version(&self, at: Option<BlockHash>) -> Result<RuntimeVersion, ClientError> {
        self.request("state_getRuntimeVersion", at_param(at).into_iter().collect())
            .await
    }

    /// Raw value under `key`; `None` if nothing is stored there.
    pub async fn storage(
        &self,
        key: &StorageKey,
        at: Option<BlockHash>,
    ) -> Result<Option<StorageData>, ClientError> {
        let mut params = vec![Json::String(key.to_hex())];
        params.extend(at_param(at));
        self.request("state_getStorage", params).await
    }

    /// Resolve `module::item`, fetch it and decode it with its declared type.
    ///
    /// Absent `Default` entries decode to the entry's default value; absent
    /// `Optional` entries yield `None`.
    pub async fn storage_value(
        &self,
        meta: &MetadataIndex,
        module: &str,
        item: &str,
        map_key: Option<&[u8]>,
        at: Option<BlockHash>,
    ) -> Result<Option<Value>, ClientError> {
        let entry = meta.resolve_storage(module, item)?;
        let key = StorageKeyDeriver::derive(entry, map_key)?;
        let data = self.storage(&key, at).await?;
        Ok(meta.decode_storage(entry, data.as_ref().map(StorageData::as_bytes))?)
    }

    /// Hash of block `number`, or of the best block when `None`.
    pub async fn block_hash(&self, number: Option<u64>) -> Result<Option<BlockHash>, ClientError> {
        let params = number.map(|n| vec![Json::from(n)]).unwrap_or_default();
        self.request("chain_getBlockHash", params).await
    }

    pub async fn finalized_head(&self) -> Result<BlockHash, ClientError> {
        self.request("chain_getFinalizedHead", vec![]).await
    }

    /// Header of `hash`, or of the best block when `None`.
    pub async fn header(&self, hash: Option<BlockHash>) -> Result<Option<Header>, ClientError> {
        self.request("chain_getHeader", at_param(hash).into_iter().collect())
            .await
    }

    /// Full block `hash` with its extrinsics, or the best block when `None`.
    pub async fn block(&self, hash: Option<BlockHash>) -> Result<Option<SignedBlock>, ClientError> {
        self.request("chain_getBlock", at_param(hash).into_iter().collect())
            .await
    }

    pub async fn subscribe_storage(
        &self,
        keys: Vec<StorageKey>,
    ) -> Result<StorageSubscription, ClientError> {
        Ok(self.subscriptions.subscribe(keys).await?)
    }

    /// Subscribe to `System::Events` and decode each block's records.
    pub async fn subscribe_events(
        &self,
        meta: Arc<MetadataIndex>,
    ) -> Result<EventSubscription, ClientError> {
        let key = meta.storage_key("System", "Events", None)?;
        let inner = self.subscriptions.subscribe(vec![key.clone()]).await?;
        Ok(EventSubscription { inner, meta, key })
    }
}

/// Decoded `System::Events` per block.
#[derive(Debug)]
pub struct EventSubscription {
    inner: StorageSubscription,
    meta: Arc<MetadataIndex>,
    key: StorageKey,
}

impl EventSubscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.inner.handle()
    }

    pub fn metadata(&self) -> &Arc<MetadataIndex> {
        &self.meta
    }

    /// Next block's events. Change-sets that carry no events value are
    /// skipped. `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Result<(BlockHash, Vec<EventRecord>), ClientError>> {
        loop {
            let set = match self.inner.next().await? {
                Ok(set) => set,
                Err(e) => return Some(Err(e.into())),
            };
            let Some(data) = set.data_for(&self.key) else {
                continue;
            };
            let decoded = EventDecoder::decode(data.as_bytes(), &self.meta)
                .map(|records| (set.block, records))
                .map_err(ClientError::from);
            return Some(decoded);
        }
    }

    pub async fn next_timeout(
        &mut self,
        timeout: Duration,
    ) -> Recv<Result<(BlockHash, Vec<EventRecord>), ClientError>> {
        match tokio::time::timeout(timeout, self.next()).await {
            Ok(Some(item)) => Recv::Item(item),
            Ok(None) => Recv::Closed,
            Err(_) => Recv::Cancelled,
        }
    }

    pub async fn unsubscribe(self) -> Result<(), ClientError> {
        Ok(self.inner.unsubscribe().await?)
    }
}
