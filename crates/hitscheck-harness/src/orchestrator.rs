//! Sequences one validation run.
//!
//! # Phases
//!
//! ```text
//! Configured → ReferenceComputed → EnginePrepared → EngineExecuted
//!            (skipped when quick)
//!            → Extracted → Compared → Reported
//! ```
//!
//! Phases only move forward. An engine failure ends the run in whatever
//! phase it happened; nothing is retried and no partial comparison is
//! attempted.

use std::fmt;
use std::io::{self, Write};
use std::panic::Location;

use hitscheck_core::config::{ConfigError, RunConfig};
use hitscheck_core::graph::{GraphError, GraphView};
use hitscheck_core::timing::{Stopwatch, millis, timed};
use hitscheck_rank::{RankVectors, RankedVertex, Score, reference_rank, render_top_k, top_k};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::compare::{Comparison, compare_scores};
use crate::engine::{EngineError, EnginePhase, EngineSession, RankingEngine};
use crate::stats::RunStats;

/// Progress of a run, in the only order it may advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    Configured,
    ReferenceComputed,
    EnginePrepared,
    EngineExecuted,
    Extracted,
    Compared,
    Reported,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configured => "configured",
            Self::ReferenceComputed => "reference-computed",
            Self::EnginePrepared => "engine-prepared",
            Self::EngineExecuted => "engine-executed",
            Self::Extracted => "extracted",
            Self::Compared => "compared",
            Self::Reported => "reported",
        })
    }
}

/// Errors that end a run before a statistics record is produced.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error("engine failed during {phase} (called from {location}): {source}")]
    Engine {
        phase: EnginePhase,
        location: &'static Location<'static>,
        #[source]
        source: EngineError,
    },

    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

impl HarnessError {
    /// The engine phase that failed, if this is an engine error.
    #[must_use]
    pub const fn engine_phase(&self) -> Option<EnginePhase> {
        match self {
            Self::Engine { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

trait AtPhase<T> {
    fn at_phase(self, phase: EnginePhase) -> Result<T, HarnessError>;
}

impl<T> AtPhase<T> for Result<T, EngineError> {
    #[track_caller]
    fn at_phase(self, phase: EnginePhase) -> Result<T, HarnessError> {
        let location = Location::caller();
        self.map_err(|source| HarnessError::Engine {
            phase,
            location,
            source,
        })
    }
}

struct PhaseTracker {
    current: RunPhase,
}

impl PhaseTracker {
    const fn new() -> Self {
        Self {
            current: RunPhase::Configured,
        }
    }

    fn advance(&mut self, next: RunPhase) {
        debug_assert!(next > self.current, "{} cannot follow {}", next, self.current);
        debug!(from = %self.current, to = %next, "run phase");
        self.current = next;
    }
}

/// Validate `engine` against the reference on `graph`.
///
/// Narrative output goes to `out` unless `config.quiet` is set. The
/// returned [`RunStats`] is produced either way; a failed comparison is a
/// normal outcome reported through [`RunStats::passed`].
///
/// # Errors
///
/// Returns [`HarnessError::Config`] for an invalid configuration,
/// [`HarnessError::Graph`] if the reverse graph is not the transpose of the
/// forward graph, [`HarnessError::Engine`] if any engine call fails and
/// [`HarnessError::Io`] if writing to `out` fails.
#[instrument(
    skip_all,
    fields(
        engine = engine.name(),
        vertices = graph.num_vertices(),
        arcs = graph.num_arcs(),
        quick = config.quick
    )
)]
pub fn run_validation<S, E>(
    engine: &E,
    graph: GraphView<'_>,
    config: &RunConfig,
    out: &mut dyn Write,
) -> Result<RunStats, HarnessError>
where
    S: Score,
    E: RankingEngine<S>,
{
    let total = Stopwatch::start();
    let mut phase = PhaseTracker::new();

    config.validate()?;
    graph.verify_transpose()?;

    let reference = if config.quick {
        None
    } else {
        let (ranks, elapsed) = timed(|| reference_rank::<S>(graph, config.max_iterations));
        phase.advance(RunPhase::ReferenceComputed);
        info!(ms = millis(elapsed), "reference computed");
        Some((ranks, elapsed))
    };

    let mut watch = Stopwatch::start();
    let frontier = engine.frontier_hint();
    let mut session = engine
        .initialize(graph, &config.devices, &config.partition)
        .at_phase(EnginePhase::Initialize)?;
    session
        .reset(config.source, config.delta, frontier)
        .at_phase(EnginePhase::Reset)?;
    let preprocess = watch.lap();
    phase.advance(RunPhase::EnginePrepared);

    session
        .run(config.max_iterations)
        .at_phase(EnginePhase::Run)?;
    let compute = watch.lap();
    phase.advance(RunPhase::EngineExecuted);
    info!(ms = millis(compute), "engine run complete");

    let computed = session.extract().at_phase(EnginePhase::Extract)?;
    phase.advance(RunPhase::Extracted);

    let comparisons = reference
        .as_ref()
        .map(|(reference, _)| compare_all(&computed, reference, config));
    phase.advance(RunPhase::Compared);

    let top_hubs = top_k(&computed.hubs, config.top_k);
    let top_authorities = top_k(&computed.authorities, config.top_k);
    let postprocess = watch.lap();

    if !config.quiet {
        write_report(
            out,
            config,
            comparisons.as_ref(),
            &top_hubs,
            &top_authorities,
        )?;
    }
    phase.advance(RunPhase::Reported);

    let verdict = Verdict::of(comparisons.as_ref());

    Ok(RunStats {
        engine: engine.name().to_string(),
        precision: S::PRECISION.to_string(),
        vertices: graph.num_vertices(),
        arcs: graph.num_arcs(),
        max_iterations: config.max_iterations,
        error_threshold: config.error_threshold,
        quick: config.quick,
        frontier: frontier.to_string(),
        devices: config.devices.ids.clone(),
        reference_ms: reference.as_ref().map(|(_, elapsed)| millis(*elapsed)),
        preprocess_ms: millis(preprocess),
        compute_ms: millis(compute),
        postprocess_ms: millis(postprocess),
        total_ms: millis(total.elapsed()),
        hub_mismatches: verdict.hub_mismatches,
        authority_mismatches: verdict.authority_mismatches,
        divergence: verdict.divergence,
        passed: verdict.divergence.map(|d| d == 0),
        top_hubs: top_hubs.into_iter().map(RankedVertex::widen).collect(),
        top_authorities: top_authorities
            .into_iter()
            .map(RankedVertex::widen)
            .collect(),
    })
}

type Comparisons<S> = (Comparison<S>, Option<Comparison<S>>);

/// Mismatch counts as recorded in [`RunStats`].
struct Verdict {
    hub_mismatches: Option<usize>,
    authority_mismatches: Option<usize>,
    divergence: Option<usize>,
}

impl Verdict {
    fn of<S: Score>(comparisons: Option<&Comparisons<S>>) -> Self {
        let Some((hubs, authorities)) = comparisons else {
            return Self {
                hub_mismatches: None,
                authority_mismatches: None,
                divergence: None,
            };
        };

        let authority_mismatches = authorities.as_ref().map(|a| a.mismatches);
        let divergence = hubs.mismatches + authority_mismatches.unwrap_or(0);
        if divergence > 0 {
            warn!(
                hub_mismatches = hubs.mismatches,
                ?authority_mismatches,
                "engine output diverges from reference"
            );
        }
        Self {
            hub_mismatches: Some(hubs.mismatches),
            authority_mismatches,
            divergence: Some(divergence),
        }
    }
}

fn compare_all<S: Score>(
    computed: &RankVectors<S>,
    reference: &RankVectors<S>,
    config: &RunConfig,
) -> Comparisons<S> {
    let hubs = compare_scores(&computed.hubs, &reference.hubs, config.error_threshold);
    let authorities = config.compare_authorities.then(|| {
        compare_scores(
            &computed.authorities,
            &reference.authorities,
            config.error_threshold,
        )
    });
    (hubs, authorities)
}

fn write_report<S: Score>(
    out: &mut dyn Write,
    config: &RunConfig,
    comparisons: Option<&Comparisons<S>>,
    top_hubs: &[RankedVertex<S>],
    top_authorities: &[RankedVertex<S>],
) -> io::Result<()> {
    match comparisons {
        None => writeln!(
            out,
            "quick run: {} rounds, no comparison performed",
            config.max_iterations
        )?,
        Some((hubs, authorities)) => {
            hubs.report(out, "hubs", config.verbose)?;
            if let Some(authorities) = authorities {
                authorities.report(out, "authorities", config.verbose)?;
            }

            let passed = hubs.passed() && authorities.as_ref().is_none_or(Comparison::passed);
            write!(
                out,
                "{}: hubs {}/{} mismatched",
                if passed { "PASS" } else { "FAIL" },
                hubs.mismatches,
                hubs.len
            )?;
            if let Some(authorities) = authorities {
                write!(
                    out,
                    ", authorities {}/{} mismatched",
                    authorities.mismatches, authorities.len
                )?;
            }
            writeln!(out, " (threshold {})", config.error_threshold)?;
        }
    }

    if config.verbose {
        render_top_k(out, "hubs", top_hubs)?;
        render_top_k(out, "authorities", top_authorities)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_error(phase: EnginePhase) -> Result<(), EngineError> {
        Err(EngineError::Injected(phase))
    }

    #[test]
    fn at_phase_records_call_site() {
        let line = line!() + 1;
        let err = engine_error(EnginePhase::Reset).at_phase(EnginePhase::Reset);
        let Err(HarnessError::Engine {
            phase, location, ..
        }) = err
        else {
            panic!("expected an engine error");
        };
        assert_eq!(phase, EnginePhase::Reset);
        assert_eq!(location.line(), line);
        assert!(location.file().ends_with("orchestrator.rs"));
    }

    #[test]
    fn phases_are_ordered() {
        assert!(RunPhase::Configured < RunPhase::ReferenceComputed);
        assert!(RunPhase::EngineExecuted < RunPhase::Extracted);
        assert_eq!(RunPhase::Compared.to_string(), "compared");
    }

    #[test]
    #[should_panic(expected = "cannot follow")]
    #[cfg(debug_assertions)]
    fn tracker_rejects_going_back() {
        let mut tracker = PhaseTracker::new();
        tracker.advance(RunPhase::Extracted);
        tracker.advance(RunPhase::EnginePrepared);
    }

    #[test]
    fn engine_phase_accessor() {
        let err: HarnessError = io::Error::other("closed").into();
        assert_eq!(err.engine_phase(), None);
        let err = engine_error(EnginePhase::Run)
            .at_phase(EnginePhase::Run)
            .expect_err("engine error");
        assert_eq!(err.engine_phase(), Some(EnginePhase::Run));
        assert!(err.to_string().contains("engine failed during run"));
    }
}
