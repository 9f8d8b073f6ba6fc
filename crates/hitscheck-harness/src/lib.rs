#![forbid(unsafe_code)]
//! hitscheck-harness library.
//!
//! Drives a ranking engine through initialize → reset → run → extract,
//! checks its output against the sequential reference, and produces a
//! [`RunStats`] record.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums for engine and run failures; the sweep
//!   runner returns `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod compare;
pub mod engine;
pub mod generate;
pub mod orchestrator;
pub mod stats;
pub mod sweep;

pub use compare::{Comparison, Divergence, compare_scores};
pub use engine::{EngineError, EnginePhase, EngineSession, FrontierType, RankingEngine};
pub use orchestrator::{HarnessError, RunPhase, run_validation};
pub use stats::RunStats;
