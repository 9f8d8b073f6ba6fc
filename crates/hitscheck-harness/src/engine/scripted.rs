//! Test double that returns preset score vectors.
//!
//! A [`ScriptedEngine`] records every call it receives and can be told to
//! fail at a chosen phase. It lets orchestration tests exercise mismatch
//! reporting and failure propagation without a real engine.

use std::cell::RefCell;

use hitscheck_core::config::{DeviceConfig, PartitionConfig};
use hitscheck_core::graph::{GraphView, VertexId};
use hitscheck_rank::{RankVectors, Score};

use super::{EngineError, EnginePhase, EngineSession, FrontierType, RankingEngine};

/// One call observed by a [`ScriptedEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Initialize {
        vertices: usize,
        devices: Vec<usize>,
    },
    Reset {
        source: Option<VertexId>,
        delta: f64,
        frontier: FrontierType,
    },
    Run {
        max_iterations: usize,
    },
    Extract,
}

#[derive(Debug)]
pub struct ScriptedEngine<S> {
    output: RankVectors<S>,
    fail_at: Option<EnginePhase>,
    frontier: FrontierType,
    calls: RefCell<Vec<EngineCall>>,
}

impl<S: Score> ScriptedEngine<S> {
    /// An engine whose `extract` yields `output`.
    #[must_use]
    pub fn returning(output: RankVectors<S>) -> Self {
        Self {
            output,
            fail_at: None,
            frontier: FrontierType::default(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Fail with [`EngineError::Injected`] when `phase` is reached.
    #[must_use]
    pub const fn failing_at(mut self, phase: EnginePhase) -> Self {
        self.fail_at = Some(phase);
        self
    }

    #[must_use]
    pub const fn with_frontier(mut self, frontier: FrontierType) -> Self {
        self.frontier = frontier;
        self
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: EngineCall) {
        self.calls.borrow_mut().push(call);
    }

    fn check(&self, phase: EnginePhase) -> Result<(), EngineError> {
        if self.fail_at == Some(phase) {
            Err(EngineError::Injected(phase))
        } else {
            Ok(())
        }
    }
}

impl<S: Score> RankingEngine<S> for ScriptedEngine<S> {
    type Session<'g> = ScriptedSession<'g, S>;

    fn name(&self) -> &str {
        "scripted"
    }

    fn frontier_hint(&self) -> FrontierType {
        self.frontier
    }

    fn initialize<'g>(
        &'g self,
        graph: GraphView<'g>,
        devices: &DeviceConfig,
        _partition: &PartitionConfig,
    ) -> Result<Self::Session<'g>, EngineError> {
        self.record(EngineCall::Initialize {
            vertices: graph.num_vertices(),
            devices: devices.ids.clone(),
        });
        self.check(EnginePhase::Initialize)?;
        if devices.ids.is_empty() {
            return Err(EngineError::NoDevices);
        }
        Ok(ScriptedSession {
            engine: self,
            vertices: graph.num_vertices(),
            reset: false,
            ran: false,
        })
    }
}

/// Session handed out by [`ScriptedEngine`].
#[derive(Debug)]
pub struct ScriptedSession<'g, S> {
    engine: &'g ScriptedEngine<S>,
    vertices: usize,
    reset: bool,
    ran: bool,
}

impl<S: Score> EngineSession<S> for ScriptedSession<'_, S> {
    fn reset(
        &mut self,
        source: Option<VertexId>,
        delta: f64,
        frontier: FrontierType,
    ) -> Result<(), EngineError> {
        self.engine.record(EngineCall::Reset {
            source,
            delta,
            frontier,
        });
        self.engine.check(EnginePhase::Reset)?;
        if let Some(vertex) = source {
            if vertex >= self.vertices {
                return Err(EngineError::SourceOutOfRange {
                    vertex,
                    vertices: self.vertices,
                });
            }
        }
        self.reset = true;
        self.ran = false;
        Ok(())
    }

    fn run(&mut self, max_iterations: usize) -> Result<(), EngineError> {
        self.engine.record(EngineCall::Run { max_iterations });
        self.engine.check(EnginePhase::Run)?;
        if !self.reset {
            return Err(EngineError::NotReset(EnginePhase::Run));
        }
        self.ran = true;
        Ok(())
    }

    fn extract(&self) -> Result<RankVectors<S>, EngineError> {
        self.engine.record(EngineCall::Extract);
        self.engine.check(EnginePhase::Extract)?;
        if !self.ran {
            return Err(EngineError::NotRun);
        }
        let output = &self.engine.output;
        if output.hubs.len() != self.vertices {
            return Err(EngineError::WrongLength {
                expected: self.vertices,
                actual: output.hubs.len(),
            });
        }
        if output.authorities.len() != self.vertices {
            return Err(EngineError::WrongLength {
                expected: self.vertices,
                actual: output.authorities.len(),
            });
        }
        Ok(output.clone())
    }
}
