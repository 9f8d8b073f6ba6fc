//! Sweep runner: validate an engine on many seeded random graphs.
//!
//! Each seed produces one graph via [`random_graph`]; failing seeds are
//! collected so the first one can be replayed with `hitscheck run --seed`.

use std::ops::Range;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use hitscheck_core::config::RunConfig;
use hitscheck_core::graph::GraphPair;
use hitscheck_core::timing::LatencySummary;
use hitscheck_rank::Score;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::engine::RankingEngine;
use crate::generate::random_graph;
use crate::orchestrator::run_validation;

/// Which graphs a sweep generates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Range of seeds to execute, e.g., `0..100`.
    pub seed_range: Range<u64>,
    /// Vertices per generated graph.
    pub vertices: usize,
    /// Arcs drawn per generated graph.
    pub arcs: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            seed_range: 0..20,
            vertices: 1_000,
            arcs: 8_000,
        }
    }
}

impl SweepConfig {
    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.vertices == 0 {
            bail!("vertices must be > 0");
        }
        Ok(())
    }

    /// The graph generated for `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if graph construction fails.
    pub fn graph_for_seed(&self, seed: u64) -> Result<GraphPair> {
        random_graph(self.vertices, self.arcs, seed)
            .with_context(|| format!("failed to generate graph for seed {seed}"))
    }
}

/// Mismatch details for a single seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub seed: u64,
    pub hub_mismatches: usize,
    pub authority_mismatches: Option<usize>,
}

/// Aggregate report produced by a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Total seeds executed.
    pub runs: usize,
    /// Seeds whose comparison passed.
    pub passed: usize,
    /// First seed that failed (for replay).
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
    /// Engine `run` latency across seeds. Serialized by the caller through
    /// [`LatencySummary::to_json`].
    #[serde(skip)]
    pub compute: LatencySummary,
}

impl SweepReport {
    /// True if every seed passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validate `engine` on every seed in `sweep.seed_range`.
///
/// Each run uses `run` with `quiet` forced on.
///
/// # Errors
///
/// Returns an error if either configuration is invalid, `run.quick` is set
/// (a sweep without comparisons has nothing to report), or any run fails
/// with a [`HarnessError`](crate::HarnessError).
#[instrument(skip_all, fields(seeds = ?sweep.seed_range, vertices = sweep.vertices))]
pub fn run_sweep<S, E>(engine: &E, sweep: &SweepConfig, run: &RunConfig) -> Result<SweepReport>
where
    S: Score,
    E: RankingEngine<S>,
{
    sweep.validate()?;
    if run.quick {
        bail!("a sweep requires comparisons; quick mode is not supported");
    }

    let run = RunConfig {
        quiet: true,
        ..run.clone()
    };

    let mut passed = 0_usize;
    let mut first_failure: Option<u64> = None;
    let mut failures = Vec::new();
    let mut compute = Vec::new();

    for seed in sweep.seed_range.clone() {
        let graph = sweep.graph_for_seed(seed)?;
        let stats = run_validation::<S, E>(engine, graph.view(), &run, &mut std::io::sink())
            .with_context(|| format!("seed {seed}"))?;
        compute.push(Duration::from_secs_f64(stats.compute_ms / 1_000.0));

        if stats.failed() {
            if first_failure.is_none() {
                first_failure = Some(seed);
            }
            failures.push(SeedFailure {
                seed,
                hub_mismatches: stats.hub_mismatches.unwrap_or(0),
                authority_mismatches: stats.authority_mismatches,
            });
        } else {
            passed += 1;
        }
    }

    let report = SweepReport {
        runs: compute.len(),
        passed,
        first_failure,
        failures,
        compute: LatencySummary::from_samples(&compute),
    };
    info!(
        runs = report.runs,
        passed = report.passed,
        first_failure = ?report.first_failure,
        "sweep complete"
    );
    Ok(report)
}
