//! Capability interface to a ranking engine under test.
//!
//! # Overview
//!
//! The harness never looks inside an engine. It only needs four calls, in
//! this order:
//!
//! 1. [`RankingEngine::initialize`] hands over the graph and the
//!    device/partition layout and returns a session.
//! 2. [`EngineSession::reset`] prepares a run with an opaque source vertex,
//!    the `delta` knob, and the frontier type the engine asked for through
//!    [`RankingEngine::frontier_hint`].
//! 3. [`EngineSession::run`] performs up to `max_iterations` rounds.
//! 4. [`EngineSession::extract`] copies hub and authority scores back to
//!    host-owned vectors.
//!
//! Every call blocks until done. Any error is fatal to the run.
//!
//! Two implementations ship with the crate:
//!
//! - [`partitioned::PartitionedEngine`]: multi-threaded CPU engine that
//!   splits vertices across worker "devices".
//! - [`scripted::ScriptedEngine`]: test double returning preset vectors.

pub mod partitioned;
pub mod scripted;

use std::fmt;

use hitscheck_core::config::{DeviceConfig, PartitionConfig};
use hitscheck_core::graph::{GraphView, VertexId};
use hitscheck_rank::{RankVectors, Score};
use serde::Serialize;
use thiserror::Error;

pub use partitioned::PartitionedEngine;
pub use scripted::{EngineCall, ScriptedEngine};

/// Shape of the active set an engine wants to traverse each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrontierType {
    /// Every round visits a set of vertices.
    #[default]
    VertexFrontier,
    /// Every round visits a set of arcs.
    EdgeFrontier,
    /// The engine switches between the two.
    MixedFrontier,
}

impl fmt::Display for FrontierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VertexFrontier => "vertex-frontier",
            Self::EdgeFrontier => "edge-frontier",
            Self::MixedFrontier => "mixed-frontier",
        })
    }
}

/// The engine call that was in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePhase {
    Initialize,
    Reset,
    Run,
    Extract,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initialize => "initialize",
            Self::Reset => "reset",
            Self::Run => "run",
            Self::Extract => "extract",
        })
    }
}

/// Failure reported by an engine call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no devices requested")]
    NoDevices,

    #[error("device {id} is unavailable ({available} devices present)")]
    DeviceUnavailable { id: usize, available: usize },

    #[error("device {0} requested more than once")]
    DuplicateDevice(usize),

    #[error("invalid partition: {0}")]
    InvalidPartition(String),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("source vertex {vertex} is outside 0..{vertices}")]
    SourceOutOfRange { vertex: VertexId, vertices: usize },

    #[error("invalid {name}: {detail}")]
    InvalidParameter { name: &'static str, detail: String },

    #[error("engine returned {actual} scores for {expected} vertices")]
    WrongLength { expected: usize, actual: usize },

    #[error("{0} called before reset")]
    NotReset(EnginePhase),

    #[error("extract called before run")]
    NotRun,

    #[error("injected failure during {0}")]
    Injected(EnginePhase),
}

/// An engine able to compute HITS scores over a [`GraphView`].
pub trait RankingEngine<S: Score> {
    /// Per-graph handle returned by [`initialize`](Self::initialize).
    type Session<'g>: EngineSession<S>
    where
        Self: 'g;

    /// Short name recorded in the statistics record.
    fn name(&self) -> &str;

    /// Frontier type to pass back into [`EngineSession::reset`].
    fn frontier_hint(&self) -> FrontierType;

    /// Load a graph onto the requested devices.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] if the devices or partition layout cannot
    /// be honoured.
    fn initialize<'g>(
        &'g self,
        graph: GraphView<'g>,
        devices: &DeviceConfig,
        partition: &PartitionConfig,
    ) -> Result<Self::Session<'g>, EngineError>;
}

/// A graph loaded into an engine.
pub trait EngineSession<S: Score> {
    /// Prepare for a run.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] if the parameters are rejected.
    fn reset(
        &mut self,
        source: Option<VertexId>,
        delta: f64,
        frontier: FrontierType,
    ) -> Result<(), EngineError>;

    /// Perform up to `max_iterations` rounds.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] if the session was not reset or the
    /// engine fails.
    fn run(&mut self, max_iterations: usize) -> Result<(), EngineError>;

    /// Copy the scores out of the engine.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] if no run has completed.
    fn extract(&self) -> Result<RankVectors<S>, EngineError>;
}
