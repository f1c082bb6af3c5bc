//! # chainstate-observability
//!
//! Structured logging for chainstate.
//!
//! Every crate logs through `tracing`; this crate installs the subscriber.
//! Log levels are configurable per component (`chainstate-rpc`,
//! `chainstate-metadata`, ...), and output is either human-readable text or
//! JSON lines for ELK, Loki or CloudWatch.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
