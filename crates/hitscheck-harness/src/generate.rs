//! Seeded random graphs for smoke runs and sweeps.

use hitscheck_core::graph::{GraphError, GraphPair, MAX_VERTICES, VertexId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draw `arcs` arcs uniformly over `vertices` vertices.
///
/// Self-loops are never drawn; duplicate arcs are kept. The same seed always
/// produces the same graph. A graph with fewer than two vertices has no
/// arcs.
///
/// # Errors
///
/// Returns [`GraphError::TooManyVertices`] above [`MAX_VERTICES`]. Any other
/// error indicates a bug in the generator.
pub fn random_graph(vertices: usize, arcs: usize, seed: u64) -> Result<GraphPair, GraphError> {
    if vertices > MAX_VERTICES {
        return Err(GraphError::TooManyVertices {
            vertices,
            max: MAX_VERTICES,
        });
    }
    if vertices < 2 {
        return GraphPair::from_arcs(vertices, std::iter::empty());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let drawn: Vec<(VertexId, VertexId)> = (0..arcs)
        .map(|_| {
            let v = rng.gen_range(0..vertices);
            let mut w = rng.gen_range(0..vertices - 1);
            if w >= v {
                w += 1;
            }
            (v, w)
        })
        .collect();

    GraphPair::from_arcs(vertices, drawn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_graph() {
        let a = random_graph(50, 200, 9).expect("graph");
        let b = random_graph(50, 200, 9).expect("graph");
        assert_eq!(a, b);

        let c = random_graph(50, 200, 10).expect("graph");
        assert_ne!(a, c);
    }

    #[test]
    fn arc_count_and_no_self_loops() {
        let g = random_graph(30, 500, 1).expect("graph");
        let view = g.view();
        assert_eq!(view.num_vertices(), 30);
        assert_eq!(view.num_arcs(), 500);
        assert!(view.forward().arcs().all(|(v, w)| v != w));
        assert!(view.verify_transpose().is_ok());
    }

    #[test]
    fn tiny_graphs_have_no_arcs() {
        assert_eq!(random_graph(0, 10, 0).expect("graph").view().num_arcs(), 0);
        assert_eq!(random_graph(1, 10, 0).expect("graph").view().num_arcs(), 0);
    }

    #[test]
    fn oversized_request_fails_before_drawing() {
        let err = random_graph(usize::MAX, usize::MAX, 0).expect_err("too many vertices");
        assert!(matches!(err, GraphError::TooManyVertices { .. }));
    }
}
