//! Multi-threaded CPU engine with a device/partition layout.
//!
//! Each requested device becomes one worker thread in a private rayon pool.
//! The vertex set is split into `devices × factor` parts according to the
//! [`PartitionPolicy`]. A round computes the authority scores of every part
//! in parallel, reduces the per-part squared norms in part order,
//! normalizes, then repeats the same for hub scores.
//!
//! Row sums use the same neighbour order as the reference, so results only
//! differ from it by the order in which squared norms are added. With a
//! single part the output is bit-identical to the reference.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use hitscheck_core::config::{DeviceConfig, PartitionConfig, PartitionPolicy};
use hitscheck_core::graph::{CsrGraph, GraphView, VertexId};
use hitscheck_rank::hits::gather_row;
use hitscheck_rank::{RankVectors, Score};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use super::{EngineError, EnginePhase, EngineSession, FrontierType, RankingEngine};

/// Production engine. See the [module documentation](self).
#[derive(Debug, Clone)]
pub struct PartitionedEngine {
    available_devices: usize,
}

impl Default for PartitionedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PartitionedEngine {
    /// One device per available hardware thread.
    #[must_use]
    pub fn new() -> Self {
        let available = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::with_available_devices(available)
    }

    /// Pretend exactly `available` devices exist (ids `0..available`).
    #[must_use]
    pub const fn with_available_devices(available: usize) -> Self {
        Self {
            available_devices: available,
        }
    }

    #[must_use]
    pub const fn available_devices(&self) -> usize {
        self.available_devices
    }

    fn check_devices(&self, devices: &DeviceConfig) -> Result<(), EngineError> {
        if devices.ids.is_empty() {
            return Err(EngineError::NoDevices);
        }
        let mut seen = BTreeSet::new();
        for &id in &devices.ids {
            if id >= self.available_devices {
                return Err(EngineError::DeviceUnavailable {
                    id,
                    available: self.available_devices,
                });
            }
            if !seen.insert(id) {
                return Err(EngineError::DuplicateDevice(id));
            }
        }
        Ok(())
    }
}

impl<S: Score> RankingEngine<S> for PartitionedEngine {
    type Session<'g> = PartitionedSession<'g, S>;

    fn name(&self) -> &str {
        "partitioned-cpu"
    }

    fn frontier_hint(&self) -> FrontierType {
        FrontierType::VertexFrontier
    }

    #[instrument(skip_all, fields(devices = devices.count(), policy = %partition.policy))]
    fn initialize<'g>(
        &'g self,
        graph: GraphView<'g>,
        devices: &DeviceConfig,
        partition: &PartitionConfig,
    ) -> Result<Self::Session<'g>, EngineError> {
        self.check_devices(devices)?;
        if partition.factor == 0 {
            return Err(EngineError::InvalidPartition(
                "factor must be >= 1".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(devices.count())
            .thread_name(|i| format!("hitscheck-device-{i}"))
            .build()
            .map_err(|err| EngineError::ThreadPool(err.to_string()))?;

        let part_count = devices.count() * partition.factor;
        let parts = build_parts(graph, part_count, partition);
        info!(
            parts = parts.len(),
            vertices = graph.num_vertices(),
            "graph partitioned"
        );

        Ok(PartitionedSession {
            graph,
            pool,
            parts,
            ranks: RankVectors::zeroed(graph.num_vertices()),
            state: SessionState::Initialized,
            delta: 0.0,
            source: None,
            frontier: FrontierType::default(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Initialized,
    Reset,
    Ran { rounds: usize },
}

/// A graph loaded into a [`PartitionedEngine`].
pub struct PartitionedSession<'g, S> {
    graph: GraphView<'g>,
    pool: rayon::ThreadPool,
    parts: Vec<Vec<VertexId>>,
    ranks: RankVectors<S>,
    state: SessionState,
    delta: f64,
    source: Option<VertexId>,
    frontier: FrontierType,
}

impl<S> std::fmt::Debug for PartitionedSession<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedSession")
            .field("parts", &self.parts.len())
            .field("state", &self.state)
            .field("delta", &self.delta)
            .field("source", &self.source)
            .field("frontier", &self.frontier)
            .finish_non_exhaustive()
    }
}

impl<S> PartitionedSession<'_, S> {
    /// Vertex lists of every part, each in ascending order.
    #[must_use]
    pub fn parts(&self) -> &[Vec<VertexId>] {
        &self.parts
    }
}

impl<S: Score> PartitionedSession<'_, S> {
    /// Recompute `target` from `source` over `adjacency`, part by part.
    fn sweep(&self, adjacency: &CsrGraph, source: &[S], target: &mut [S]) -> S {
        let computed: Vec<(Vec<S>, S)> = self.pool.install(|| {
            self.parts
                .par_iter()
                .map(|part| {
                    let values: Vec<S> = part
                        .iter()
                        .map(|&v| gather_row(adjacency.neighbors(v), source))
                        .collect();
                    let sum_sq = values.iter().fold(S::zero(), |acc, &x| acc + x * x);
                    (values, sum_sq)
                })
                .collect()
        });

        let mut sum_sq = S::zero();
        for (part, (values, part_sq)) in self.parts.iter().zip(computed) {
            for (&v, value) in part.iter().zip(values) {
                target[v] = value;
            }
            sum_sq = sum_sq + part_sq;
        }
        sum_sq.sqrt()
    }

    fn normalize(&self, values: &mut [S], norm: S) {
        self.pool.install(|| {
            values.par_iter_mut().for_each(|x| *x = *x / norm);
        });
    }
}

impl<S: Score> EngineSession<S> for PartitionedSession<'_, S> {
    fn reset(
        &mut self,
        source: Option<VertexId>,
        delta: f64,
        frontier: FrontierType,
    ) -> Result<(), EngineError> {
        let vertices = self.graph.num_vertices();
        if let Some(vertex) = source {
            if vertex >= vertices {
                return Err(EngineError::SourceOutOfRange { vertex, vertices });
            }
        }
        if !delta.is_finite() {
            return Err(EngineError::InvalidParameter {
                name: "delta",
                detail: format!("must be finite, got {delta}"),
            });
        }

        self.source = source;
        self.delta = delta;
        self.frontier = frontier;
        self.ranks.hubs.fill(S::one());
        self.ranks.authorities.fill(S::one());
        self.state = SessionState::Reset;
        debug!(?source, delta, %frontier, "session reset");
        Ok(())
    }

    /// Runs `max_iterations` more rounds, continuing from the current scores
    /// if called again without a reset.
    fn run(&mut self, max_iterations: usize) -> Result<(), EngineError> {
        let done = match self.state {
            SessionState::Initialized => return Err(EngineError::NotReset(EnginePhase::Run)),
            SessionState::Reset => 0,
            SessionState::Ran { rounds } => rounds,
        };

        let graph = self.graph;
        let mut ranks = std::mem::take(&mut self.ranks);
        for round in 0..max_iterations {
            let norm_auth = self.sweep(graph.reverse(), &ranks.hubs, &mut ranks.authorities);
            self.normalize(&mut ranks.authorities, norm_auth);

            let norm_hub = self.sweep(graph.forward(), &ranks.authorities, &mut ranks.hubs);
            self.normalize(&mut ranks.hubs, norm_hub);

            debug!(round = done + round, %norm_auth, %norm_hub, "engine round complete");
        }
        self.ranks = ranks;
        self.state = SessionState::Ran {
            rounds: done + max_iterations,
        };
        Ok(())
    }

    fn extract(&self) -> Result<RankVectors<S>, EngineError> {
        match self.state {
            SessionState::Ran { .. } => Ok(self.ranks.clone()),
            SessionState::Initialized | SessionState::Reset => Err(EngineError::NotRun),
        }
    }
}

/// Split the vertex set into `count` parts. Parts may be empty when there
/// are fewer vertices than parts.
fn build_parts(
    graph: GraphView<'_>,
    count: usize,
    partition: &PartitionConfig,
) -> Vec<Vec<VertexId>> {
    let n = graph.num_vertices();
    match partition.policy {
        PartitionPolicy::Contiguous => (0..count)
            .map(|i| (i * n / count..(i + 1) * n / count).collect())
            .collect(),
        PartitionPolicy::EdgeBalanced => edge_balanced(graph, count),
        PartitionPolicy::Random => {
            let mut rng = StdRng::seed_from_u64(partition.seed);
            let mut parts = vec![Vec::new(); count];
            for v in 0..n {
                parts[rng.gen_range(0..count)].push(v);
            }
            parts
        }
    }
}

/// Contiguous ranges whose in- plus out-degree (plus one per vertex) is
/// roughly equal.
fn edge_balanced(graph: GraphView<'_>, count: usize) -> Vec<Vec<VertexId>> {
    let n = graph.num_vertices();
    let weight = |v: VertexId| graph.forward().degree(v) + graph.reverse().degree(v) + 1;
    let total: usize = (0..n).map(weight).sum();

    let mut parts = vec![Vec::new(); count];
    let mut part = 0;
    let mut acc = 0;
    for v in 0..n {
        while part + 1 < count && acc * count >= total * (part + 1) {
            part += 1;
        }
        parts[part].push(v);
        acc += weight(v);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitscheck_core::graph::GraphPair;
    use hitscheck_rank::reference_rank;

    fn devices(ids: &[usize]) -> DeviceConfig {
        DeviceConfig { ids: ids.to_vec() }
    }

    fn layout(policy: PartitionPolicy, factor: usize) -> PartitionConfig {
        PartitionConfig {
            policy,
            factor,
            seed: 3,
        }
    }

    fn chain(n: usize) -> GraphPair {
        GraphPair::from_arcs(n, (0..n - 1).map(|v| (v, v + 1))).expect("valid chain")
    }

    fn run_engine(
        engine: &PartitionedEngine,
        graph: &GraphPair,
        ids: &[usize],
        partition: &PartitionConfig,
        iterations: usize,
    ) -> RankVectors<f64> {
        let mut session =
            RankingEngine::<f64>::initialize(engine, graph.view(), &devices(ids), partition)
                .expect("initialize");
        session
            .reset(None, 0.85, FrontierType::VertexFrontier)
            .expect("reset");
        session.run(iterations).expect("run");
        session.extract().expect("extract")
    }

    #[test]
    fn single_part_is_bit_identical_to_reference() {
        let engine = PartitionedEngine::with_available_devices(4);
        let g = GraphPair::from_arcs(5, [(0, 1), (1, 2), (2, 0), (3, 1), (4, 3), (0, 4)])
            .expect("valid arcs");
        let ranks = run_engine(&engine, &g, &[0], &layout(PartitionPolicy::Contiguous, 1), 12);
        let reference: RankVectors<f64> = reference_rank(g.view(), 12);
        assert_eq!(ranks, reference);
    }

    #[test]
    fn every_policy_agrees_with_reference() {
        let engine = PartitionedEngine::with_available_devices(4);
        let g = GraphPair::from_arcs(
            8,
            [
                (0, 1),
                (0, 2),
                (1, 3),
                (2, 3),
                (3, 4),
                (4, 5),
                (5, 6),
                (6, 7),
                (7, 0),
                (2, 6),
            ],
        )
        .expect("valid arcs");
        let reference: RankVectors<f64> = reference_rank(g.view(), 20);

        for policy in [
            PartitionPolicy::Contiguous,
            PartitionPolicy::EdgeBalanced,
            PartitionPolicy::Random,
        ] {
            let ranks = run_engine(&engine, &g, &[0, 1, 2], &layout(policy, 2), 20);
            for v in 0..8 {
                assert!((ranks.hubs[v] - reference.hubs[v]).abs() < 1e-12, "{policy}");
                assert!(
                    (ranks.authorities[v] - reference.authorities[v]).abs() < 1e-12,
                    "{policy}"
                );
            }
        }
    }

    #[test]
    fn parts_cover_every_vertex_once() {
        let engine = PartitionedEngine::with_available_devices(4);
        let g = chain(11);
        for policy in [
            PartitionPolicy::Contiguous,
            PartitionPolicy::EdgeBalanced,
            PartitionPolicy::Random,
        ] {
            let session = RankingEngine::<f64>::initialize(
                &engine,
                g.view(),
                &devices(&[0, 1]),
                &layout(policy, 3),
            )
            .expect("initialize");
            assert_eq!(session.parts().len(), 6);
            let mut all: Vec<VertexId> = session.parts().iter().flatten().copied().collect();
            all.sort_unstable();
            assert_eq!(all, (0..11).collect::<Vec<_>>(), "{policy}");
            for part in session.parts() {
                assert!(part.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn more_parts_than_vertices_leaves_empty_parts() {
        let g = chain(2);
        let parts = build_parts(g.view(), 4, &layout(PartitionPolicy::Contiguous, 1));
        assert_eq!(parts.len(), 4);
        assert_eq!(parts.iter().map(Vec::len).sum::<usize>(), 2);
    }

    #[test]
    fn edge_balanced_splits_by_weight() {
        // Weights are [6, 2, 2, 2, 2, 2]; vertex 0 carries most of the arcs.
        let g = GraphPair::from_arcs(6, [(0, 1), (0, 2), (0, 3), (0, 4), (0, 5)])
            .expect("valid arcs");
        let parts = edge_balanced(g.view(), 2);
        assert_eq!(parts[0], vec![0, 1]);
        assert_eq!(parts[1], vec![2, 3, 4, 5]);

        let contiguous = build_parts(g.view(), 2, &layout(PartitionPolicy::Contiguous, 1));
        assert_eq!(contiguous[0], vec![0, 1, 2]);
    }

    #[test]
    fn device_checks() {
        let engine = PartitionedEngine::with_available_devices(2);
        let g = chain(3);
        let part = layout(PartitionPolicy::Contiguous, 1);

        let err = RankingEngine::<f64>::initialize(&engine, g.view(), &devices(&[]), &part)
            .expect_err("no devices");
        assert_eq!(err, EngineError::NoDevices);

        let err = RankingEngine::<f64>::initialize(&engine, g.view(), &devices(&[0, 2]), &part)
            .expect_err("device 2 missing");
        assert_eq!(
            err,
            EngineError::DeviceUnavailable {
                id: 2,
                available: 2
            }
        );

        let err = RankingEngine::<f64>::initialize(&engine, g.view(), &devices(&[1, 1]), &part)
            .expect_err("duplicate");
        assert_eq!(err, EngineError::DuplicateDevice(1));

        let err = RankingEngine::<f64>::initialize(
            &engine,
            g.view(),
            &devices(&[0]),
            &layout(PartitionPolicy::Contiguous, 0),
        )
        .expect_err("zero factor");
        assert!(matches!(err, EngineError::InvalidPartition(_)));
    }

    #[test]
    fn calls_out_of_order_are_rejected() {
        let engine = PartitionedEngine::with_available_devices(1);
        let g = chain(3);
        let mut session: PartitionedSession<'_, f64> = RankingEngine::<f64>::initialize(
            &engine,
            g.view(),
            &devices(&[0]),
            &layout(PartitionPolicy::Contiguous, 1),
        )
        .expect("initialize");

        assert_eq!(
            session.run(3),
            Err(EngineError::NotReset(EnginePhase::Run))
        );
        assert_eq!(session.extract(), Err(EngineError::NotRun));

        assert_eq!(
            session.reset(Some(3), 0.85, FrontierType::VertexFrontier),
            Err(EngineError::SourceOutOfRange {
                vertex: 3,
                vertices: 3
            })
        );
        assert!(matches!(
            session.reset(None, f64::NAN, FrontierType::VertexFrontier),
            Err(EngineError::InvalidParameter { name: "delta", .. })
        ));

        session
            .reset(Some(0), 0.85, FrontierType::VertexFrontier)
            .expect("reset");
        assert_eq!(session.extract(), Err(EngineError::NotRun));
        session.run(2).expect("run");
        assert!(session.extract().is_ok());
    }

    #[test]
    fn repeated_run_continues_and_reset_restarts() {
        let engine = PartitionedEngine::with_available_devices(2);
        let g = GraphPair::from_arcs(4, [(0, 1), (1, 2), (2, 3), (3, 1), (0, 2)])
            .expect("valid arcs");
        let mut session: PartitionedSession<'_, f64> = RankingEngine::<f64>::initialize(
            &engine,
            g.view(),
            &devices(&[0]),
            &layout(PartitionPolicy::Contiguous, 1),
        )
        .expect("initialize");

        session
            .reset(None, 0.85, FrontierType::VertexFrontier)
            .expect("reset");
        session.run(2).expect("run");
        session.run(3).expect("run");
        let continued = session.extract().expect("extract");
        assert_eq!(continued, reference_rank(g.view(), 5));

        session
            .reset(None, 0.85, FrontierType::VertexFrontier)
            .expect("reset");
        session.run(1).expect("run");
        assert_eq!(session.extract().expect("extract"), reference_rank(g.view(), 1));
    }
}
