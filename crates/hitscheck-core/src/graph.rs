//! Compressed sparse row (CSR) adjacency and the forward/transpose view.
//!
//! # Overview
//!
//! A [`CsrGraph`] stores, for every vertex `0..N`, a contiguous run of
//! neighbour ids: `offsets[v]..offsets[v + 1]` indexes into `indices`. The
//! ranking code never mutates a graph; it borrows a [`GraphView`], which
//! pairs a forward graph (vertex → successors) with its transpose
//! (vertex → predecessors).
//!
//! Self-loops are kept as ordinary arcs. Whoever builds the graph decides
//! whether to strip them.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

/// Dense vertex identifier in `0..num_vertices`.
pub type VertexId = usize;

/// Largest vertex count a graph may be built with.
pub const MAX_VERTICES: usize = 1 << 28;

/// Structural problems detected while building or pairing CSR graphs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The offsets array must contain at least the leading zero.
    #[error("offsets must hold at least one entry")]
    EmptyOffsets,

    /// The offsets array must start at zero.
    #[error("offsets must start at 0, found {0}")]
    OffsetsStart(usize),

    /// The offsets array must be non-decreasing.
    #[error("offsets decrease at vertex {vertex}: {prev} > {next}")]
    OffsetsDecrease {
        /// Vertex whose end offset is smaller than its start offset.
        vertex: VertexId,
        /// Start offset of the row.
        prev: usize,
        /// End offset of the row.
        next: usize,
    },

    /// The final offset must equal the number of neighbour indices.
    #[error("offsets end at {end} but {len} neighbour indices were supplied")]
    IndexCountMismatch {
        /// Value of the last offset.
        end: usize,
        /// Length of the indices array.
        len: usize,
    },

    /// A neighbour id is not a valid vertex.
    #[error("neighbour {target} of vertex {vertex} is outside 0..{vertices}")]
    IndexOutOfRange {
        /// Row containing the bad neighbour.
        vertex: VertexId,
        /// The out-of-range neighbour id.
        target: VertexId,
        /// Number of vertices in the graph.
        vertices: usize,
    },

    /// An arc handed to [`CsrGraph::from_arcs`] names a missing vertex.
    #[error("arc ({src}, {dst}) references a vertex outside 0..{vertices}")]
    ArcOutOfRange {
        /// Arc source.
        src: VertexId,
        /// Arc destination.
        dst: VertexId,
        /// Number of vertices in the graph.
        vertices: usize,
    },

    /// The requested vertex count is above [`MAX_VERTICES`].
    #[error("{vertices} vertices exceed the limit of {max}")]
    TooManyVertices {
        /// Requested vertex count.
        vertices: usize,
        /// The limit, [`MAX_VERTICES`].
        max: usize,
    },

    /// Forward and reverse graphs disagree on the vertex set.
    #[error("forward graph has {forward} vertices but reverse graph has {reverse}")]
    VertexCountMismatch {
        /// Vertex count of the forward graph.
        forward: usize,
        /// Vertex count of the reverse graph.
        reverse: usize,
    },

    /// Forward and reverse graphs disagree on the number of arcs.
    #[error("forward graph has {forward} arcs but reverse graph has {reverse}")]
    ArcCountMismatch {
        /// Arc count of the forward graph.
        forward: usize,
        /// Arc count of the reverse graph.
        reverse: usize,
    },

    /// The reverse graph is not the exact transpose of the forward graph.
    #[error("reverse graph is not the transpose of the forward graph (first difference at vertex {vertex})")]
    NotTranspose {
        /// First vertex whose predecessor multiset differs.
        vertex: VertexId,
    },
}

/// Adjacency structure in compressed sparse row form.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrGraph {
    offsets: Vec<usize>,
    indices: Vec<VertexId>,
}

impl fmt::Debug for CsrGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrGraph")
            .field("vertices", &self.num_vertices())
            .field("arcs", &self.num_arcs())
            .finish_non_exhaustive()
    }
}

impl Default for CsrGraph {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            indices: Vec::new(),
        }
    }
}

fn check_vertex_count(vertices: usize) -> Result<(), GraphError> {
    if vertices > MAX_VERTICES {
        return Err(GraphError::TooManyVertices {
            vertices,
            max: MAX_VERTICES,
        });
    }
    Ok(())
}

impl CsrGraph {
    /// Build a graph from raw CSR arrays, validating their shape.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the offsets are empty, do not start at
    /// zero, decrease, disagree with `indices.len()`, or if any neighbour id
    /// is out of range.
    pub fn new(offsets: Vec<usize>, indices: Vec<VertexId>) -> Result<Self, GraphError> {
        let Some(&first) = offsets.first() else {
            return Err(GraphError::EmptyOffsets);
        };
        if first != 0 {
            return Err(GraphError::OffsetsStart(first));
        }

        for (vertex, pair) in offsets.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(GraphError::OffsetsDecrease {
                    vertex,
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }

        let end = offsets[offsets.len() - 1];
        if end != indices.len() {
            return Err(GraphError::IndexCountMismatch {
                end,
                len: indices.len(),
            });
        }

        let vertices = offsets.len() - 1;
        for (vertex, pair) in offsets.windows(2).enumerate() {
            if let Some(&target) = indices[pair[0]..pair[1]].iter().find(|&&t| t >= vertices) {
                return Err(GraphError::IndexOutOfRange {
                    vertex,
                    target,
                    vertices,
                });
            }
        }

        Ok(Self { offsets, indices })
    }

    /// A graph with `vertices` vertices and no arcs.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::TooManyVertices`] above [`MAX_VERTICES`].
    pub fn empty(vertices: usize) -> Result<Self, GraphError> {
        check_vertex_count(vertices)?;
        Ok(Self {
            offsets: vec![0; vertices + 1],
            indices: Vec::new(),
        })
    }

    /// Build a graph from an arc list.
    ///
    /// Each vertex lists its successors in the order the arcs were supplied.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::TooManyVertices`] above [`MAX_VERTICES`] and
    /// [`GraphError::ArcOutOfRange`] if an endpoint is `>= vertices`.
    pub fn from_arcs(
        vertices: usize,
        arcs: impl IntoIterator<Item = (VertexId, VertexId)>,
    ) -> Result<Self, GraphError> {
        check_vertex_count(vertices)?;
        let arcs: Vec<(VertexId, VertexId)> = arcs.into_iter().collect();

        let mut offsets = vec![0_usize; vertices + 1];
        for &(src, dst) in &arcs {
            if src >= vertices || dst >= vertices {
                return Err(GraphError::ArcOutOfRange { src, dst, vertices });
            }
            offsets[src + 1] += 1;
        }
        for v in 0..vertices {
            offsets[v + 1] += offsets[v];
        }

        let mut cursor = offsets[..vertices].to_vec();
        let mut indices = vec![0; arcs.len()];
        for (src, dst) in arcs {
            indices[cursor[src]] = dst;
            cursor[src] += 1;
        }

        Ok(Self { offsets, indices })
    }

    /// Number of vertices.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of arcs.
    #[must_use]
    pub fn num_arcs(&self) -> usize {
        self.indices.len()
    }

    /// Neighbours of `v`, in stored order.
    ///
    /// # Panics
    ///
    /// Panics if `v >= num_vertices()`.
    #[must_use]
    pub fn neighbors(&self, v: VertexId) -> &[VertexId] {
        &self.indices[self.offsets[v]..self.offsets[v + 1]]
    }

    /// Number of neighbours of `v`.
    #[must_use]
    pub fn degree(&self, v: VertexId) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    /// The raw offsets array (`num_vertices() + 1` entries).
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// The raw neighbour array.
    #[must_use]
    pub fn indices(&self) -> &[VertexId] {
        &self.indices
    }

    /// Iterate every arc as `(source, target)` in row order.
    pub fn arcs(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        (0..self.num_vertices())
            .flat_map(move |v| self.neighbors(v).iter().map(move |&w| (v, w)))
    }

    /// Build the transpose. Each row of the result is sorted by source id.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let vertices = self.num_vertices();
        let mut offsets = vec![0_usize; vertices + 1];
        for &dst in &self.indices {
            offsets[dst + 1] += 1;
        }
        for v in 0..vertices {
            offsets[v + 1] += offsets[v];
        }

        let mut cursor = offsets[..vertices].to_vec();
        let mut indices = vec![0; self.indices.len()];
        for (src, dst) in self.arcs() {
            indices[cursor[dst]] = src;
            cursor[dst] += 1;
        }

        Self { offsets, indices }
    }
}

/// Read-only pairing of a forward graph with its transpose.
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a> {
    forward: &'a CsrGraph,
    reverse: &'a CsrGraph,
}

impl<'a> GraphView<'a> {
    /// Pair a forward graph with its transpose.
    ///
    /// Only vertex and arc counts are checked here; call
    /// [`verify_transpose`](Self::verify_transpose) for the full check.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::VertexCountMismatch`] or
    /// [`GraphError::ArcCountMismatch`] when the counts disagree.
    pub fn new(forward: &'a CsrGraph, reverse: &'a CsrGraph) -> Result<Self, GraphError> {
        if forward.num_vertices() != reverse.num_vertices() {
            return Err(GraphError::VertexCountMismatch {
                forward: forward.num_vertices(),
                reverse: reverse.num_vertices(),
            });
        }
        if forward.num_arcs() != reverse.num_arcs() {
            return Err(GraphError::ArcCountMismatch {
                forward: forward.num_arcs(),
                reverse: reverse.num_arcs(),
            });
        }
        Ok(Self { forward, reverse })
    }

    /// Check that `reverse` holds exactly the reversed arcs of `forward`.
    ///
    /// Neighbour order within a row is ignored; multiplicities are not.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotTranspose`] naming the first vertex whose
    /// predecessor multiset differs.
    pub fn verify_transpose(&self) -> Result<(), GraphError> {
        let expected = self.forward.transpose();
        for v in 0..self.num_vertices() {
            let mut actual = self.reverse.neighbors(v).to_vec();
            actual.sort_unstable();
            if actual != expected.neighbors(v) {
                warn!(vertex = v, "reverse graph differs from transpose");
                return Err(GraphError::NotTranspose { vertex: v });
            }
        }
        debug!(
            vertices = self.num_vertices(),
            arcs = self.num_arcs(),
            "transpose verified"
        );
        Ok(())
    }

    /// Vertex → successors.
    #[must_use]
    pub const fn forward(&self) -> &'a CsrGraph {
        self.forward
    }

    /// Vertex → predecessors.
    #[must_use]
    pub const fn reverse(&self) -> &'a CsrGraph {
        self.reverse
    }

    /// Number of vertices shared by both graphs.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.forward.num_vertices()
    }

    /// Number of arcs in the forward graph.
    #[must_use]
    pub fn num_arcs(&self) -> usize {
        self.forward.num_arcs()
    }
}

/// Owned forward graph together with its computed transpose.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphPair {
    forward: CsrGraph,
    reverse: CsrGraph,
}

impl GraphPair {
    /// Take ownership of `forward` and compute its transpose.
    #[must_use]
    pub fn from_forward(forward: CsrGraph) -> Self {
        let reverse = forward.transpose();
        Self { forward, reverse }
    }

    /// Build both graphs from an arc list.
    ///
    /// # Errors
    ///
    /// See [`CsrGraph::from_arcs`].
    pub fn from_arcs(
        vertices: usize,
        arcs: impl IntoIterator<Item = (VertexId, VertexId)>,
    ) -> Result<Self, GraphError> {
        CsrGraph::from_arcs(vertices, arcs).map(Self::from_forward)
    }

    /// Borrow both graphs as a [`GraphView`].
    #[must_use]
    pub const fn view(&self) -> GraphView<'_> {
        GraphView {
            forward: &self.forward,
            reverse: &self.reverse,
        }
    }
}
