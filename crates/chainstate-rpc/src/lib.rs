//! # chainstate-rpc
//!
//! State queries and storage subscriptions over a node connection.
//!
//! ## Overview
//!
//! - [`Transport`]: the async trait a node connection implements
//! - [`SubscriptionManager`]: opens, tracks and releases storage subscriptions
//! - [`StateClient`]: metadata, runtime version, storage, header and block queries,
//!   plus decoded `System::Events` per block
//! - [`ClientError`]: the umbrella error of every client call

pub mod config;
pub mod error;
pub mod request;
pub mod state;
pub mod subscriptions;
pub mod transport;
pub mod types;

pub use config::ClientConfig;
pub use error::{ClientError, SubscriptionError, TransportError};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use state::{EventSubscription, StateClient};
pub use subscriptions::{Recv, StorageSubscription, SubscriptionHandle, SubscriptionManager};
pub use transport::{SubscriptionId, Transport, TransportSubscription};
pub use types::{Block, Digest, Header, Justification, RuntimeVersion, SignedBlock};
