//! Reference HITS (Hyperlink-Induced Topic Search) ranking.
//!
//! # Overview
//!
//! HITS computes two scores for each vertex:
//!
//! - **Hub score**: how much a vertex points to good authorities.
//! - **Authority score**: how much a vertex is pointed to by good hubs.
//!
//! # Algorithm
//!
//! Power iteration (Kleinberg, 1999), run for a fixed number of rounds:
//!
//! 1. Initialize all hub and authority scores to 1.
//! 2. Authority update: `auth(v) = sum of hub(u) for all u → v`, walking the
//!    transpose in ascending vertex order, then divide by the L2 norm.
//! 3. Hub update: `hub(v) = sum of auth(w) for all v → w`, using the
//!    authorities just computed, then divide by the L2 norm.
//! 4. Repeat exactly `max_iterations` times. There is no convergence exit.
//!
//! Authorities are normalized before hubs are recomputed from them. Other
//! engines are validated against this order, so it must not change.
//!
//! # Degenerate norms
//!
//! A round whose scores are all zero (for example a graph with no arcs)
//! divides by zero and every score becomes NaN. This is left unguarded so
//! the output matches engines that do the same; the round is logged at
//! `warn` level.

use hitscheck_core::graph::{CsrGraph, GraphView, VertexId};
use tracing::{debug, instrument, warn};

use crate::score::Score;

/// Hub and authority vectors, indexed by vertex id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankVectors<S> {
    pub hubs: Vec<S>,
    pub authorities: Vec<S>,
}

impl<S: Score> RankVectors<S> {
    /// Both vectors filled with zero.
    #[must_use]
    pub fn zeroed(vertices: usize) -> Self {
        Self {
            hubs: vec![S::zero(); vertices],
            authorities: vec![S::zero(); vertices],
        }
    }

    /// Number of vertices covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}

/// Sum `source[u]` over the neighbours `u` of one row, in stored order.
///
/// This is the per-vertex step shared by every engine that wants to match
/// the reference summation order within a row.
#[must_use]
pub fn gather_row<S: Score>(neighbors: &[VertexId], source: &[S]) -> S {
    neighbors
        .iter()
        .fold(S::zero(), |acc, &u| acc + source[u])
}

/// Recompute every row of `target` from `source` and return the L2 norm.
fn gather<S: Score>(adjacency: &CsrGraph, source: &[S], target: &mut [S]) -> S {
    let mut sum_sq = S::zero();
    for (v, slot) in target.iter_mut().enumerate() {
        let value = gather_row(adjacency.neighbors(v), source);
        *slot = value;
        sum_sq = sum_sq + value * value;
    }
    sum_sq.sqrt()
}

fn divide_all<S: Score>(values: &mut [S], norm: S) {
    for x in values.iter_mut() {
        *x = *x / norm;
    }
}

/// Compute HITS scores in place.
///
/// `hubs` and `authorities` are overwritten; their previous contents are
/// ignored. Identical inputs always produce bit-identical outputs.
///
/// # Panics
///
/// Panics if either vector's length differs from the graph's vertex count.
#[instrument(
    skip(graph, hubs, authorities),
    fields(vertices = graph.num_vertices(), arcs = graph.num_arcs())
)]
pub fn reference_hits<S: Score>(
    graph: GraphView<'_>,
    max_iterations: usize,
    hubs: &mut [S],
    authorities: &mut [S],
) {
    let n = graph.num_vertices();
    assert_eq!(hubs.len(), n, "hub vector length must equal vertex count");
    assert_eq!(
        authorities.len(),
        n,
        "authority vector length must equal vertex count"
    );

    hubs.fill(S::one());
    authorities.fill(S::one());

    if n == 0 {
        return;
    }

    for round in 0..max_iterations {
        let norm_auth = gather(graph.reverse(), hubs, authorities);
        if norm_auth == S::zero() {
            warn!(round, "authority norm is zero; scores will be NaN");
        }
        divide_all(authorities, norm_auth);

        let norm_hub = gather(graph.forward(), authorities, hubs);
        if norm_hub == S::zero() {
            warn!(round, "hub norm is zero; scores will be NaN");
        }
        divide_all(hubs, norm_hub);

        debug!(round, %norm_auth, %norm_hub, "reference round complete");
    }
}

/// Allocate score vectors and compute HITS into them.
#[must_use]
pub fn reference_rank<S: Score>(graph: GraphView<'_>, max_iterations: usize) -> RankVectors<S> {
    let mut ranks = RankVectors::zeroed(graph.num_vertices());
    reference_hits(
        graph,
        max_iterations,
        &mut ranks.hubs,
        &mut ranks.authorities,
    );
    ranks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
