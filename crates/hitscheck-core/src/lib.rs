#![forbid(unsafe_code)]
//! hitscheck-core library.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per module; binaries wrap them in `anyhow`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod graph;
pub mod timing;

pub use config::{ConfigError, DeviceConfig, PartitionConfig, PartitionPolicy, Precision, RunConfig};
pub use graph::{CsrGraph, GraphError, GraphPair, GraphView, MAX_VERTICES, VertexId};
