//! Whitespace edge-list input.
//!
//! One `src dst` pair per line. Lines starting with `#` or `%` and blank
//! lines are skipped; any fields after the second are ignored (weights in
//! common exports). The vertex count is one more than the largest id seen,
//! or `min_vertices` if that is larger. Ids at or above [`MAX_VERTICES`]
//! are rejected.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use hitscheck_core::graph::{GraphPair, MAX_VERTICES, VertexId};
use tracing::debug;

/// How an edge list is turned into a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeListOptions {
    pub min_vertices: usize,
    pub drop_self_loops: bool,
    pub drop_duplicates: bool,
}

impl Default for EdgeListOptions {
    fn default() -> Self {
        Self {
            min_vertices: 0,
            drop_self_loops: true,
            drop_duplicates: true,
        }
    }
}

/// Parse edge-list text into a graph.
///
/// # Errors
///
/// Returns an error naming the 1-based line of the first malformed pair.
pub fn parse_edge_list(text: &str, options: EdgeListOptions) -> Result<GraphPair> {
    let mut arcs: Vec<(VertexId, VertexId)> = Vec::new();
    let mut seen = HashSet::new();
    let mut vertices = options.min_vertices;
    let mut self_loops = 0_usize;
    let mut duplicates = 0_usize;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let (Some(src), Some(dst)) = (fields.next(), fields.next()) else {
            bail!("line {line_no}: expected `src dst`, found `{trimmed}`");
        };
        let src: VertexId = src
            .parse()
            .with_context(|| format!("line {line_no}: invalid source vertex `{src}`"))?;
        let dst: VertexId = dst
            .parse()
            .with_context(|| format!("line {line_no}: invalid target vertex `{dst}`"))?;

        let largest = src.max(dst);
        if largest >= MAX_VERTICES {
            bail!("line {line_no}: vertex id {largest} too large (limit {MAX_VERTICES})");
        }
        vertices = vertices.max(largest + 1);

        if options.drop_self_loops && src == dst {
            self_loops += 1;
            continue;
        }
        if options.drop_duplicates && !seen.insert((src, dst)) {
            duplicates += 1;
            continue;
        }
        arcs.push((src, dst));
    }

    debug!(
        vertices,
        arcs = arcs.len(),
        self_loops,
        duplicates,
        "edge list parsed"
    );
    Ok(GraphPair::from_arcs(vertices, arcs)?)
}

/// Read and parse an edge-list file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is malformed.
pub fn read_edge_list(path: &Path, options: EdgeListOptions) -> Result<GraphPair> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph {}", path.display()))?;
    parse_edge_list(&text, options).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_skips_comments() {
        let text = "# header\n% matrix-market style\n\n0 1\n1 2 0.5\n  2 0  \n";
        let g = parse_edge_list(text, EdgeListOptions::default()).expect("valid");
        let view = g.view();
        assert_eq!(view.num_vertices(), 3);
        assert_eq!(view.num_arcs(), 3);
        assert_eq!(view.forward().neighbors(1), &[2]);
    }

    #[test]
    fn drops_self_loops_and_duplicates_by_default() {
        let text = "0 1\n0 1\n1 1\n1 0\n";
        let g = parse_edge_list(text, EdgeListOptions::default()).expect("valid");
        assert_eq!(g.view().num_arcs(), 2);
        // A dropped self-loop still counts toward the vertex range.
        let g = parse_edge_list("0 1\n4 4\n", EdgeListOptions::default()).expect("valid");
        assert_eq!(g.view().num_vertices(), 5);
    }

    #[test]
    fn keeps_everything_when_asked() {
        let options = EdgeListOptions {
            drop_self_loops: false,
            drop_duplicates: false,
            ..EdgeListOptions::default()
        };
        let g = parse_edge_list("0 1\n0 1\n1 1\n", options).expect("valid");
        assert_eq!(g.view().num_arcs(), 3);
    }

    #[test]
    fn min_vertices_pads_isolated_vertices() {
        let options = EdgeListOptions {
            min_vertices: 10,
            ..EdgeListOptions::default()
        };
        let g = parse_edge_list("0 1\n", options).expect("valid");
        assert_eq!(g.view().num_vertices(), 10);
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse_edge_list("0 1\n2\n", EdgeListOptions::default()).expect_err("one field");
        assert!(err.to_string().starts_with("line 2:"));

        let err =
            parse_edge_list("0 1\n\n1 x\n", EdgeListOptions::default()).expect_err("not a number");
        assert!(err.to_string().contains("line 3: invalid target vertex `x`"));
    }

    #[test]
    fn huge_ids_are_rejected_with_line_number() {
        let err = parse_edge_list("0 1\n0 18446744073709551615\n", EdgeListOptions::default())
            .expect_err("id above the limit");
        assert!(err.to_string().starts_with("line 2: vertex id 18446744073709551615 too large"));

        let text = format!("{MAX_VERTICES} 0\n");
        let err = parse_edge_list(&text, EdgeListOptions::default()).expect_err("at the limit");
        assert!(err.to_string().starts_with("line 1:"));
    }

    #[test]
    fn oversized_min_vertices_is_an_error() {
        let options = EdgeListOptions {
            min_vertices: usize::MAX,
            ..EdgeListOptions::default()
        };
        let err = parse_edge_list("0 1\n", options).expect_err("too many vertices");
        assert!(err.to_string().contains("exceed the limit"));
    }

    #[test]
    fn empty_input_is_an_empty_graph() {
        let g = parse_edge_list("# nothing\n", EdgeListOptions::default()).expect("valid");
        assert_eq!(g.view().num_vertices(), 0);
    }

    #[test]
    fn read_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_edge_list(&dir.path().join("absent.txt"), EdgeListOptions::default())
            .expect_err("missing");
        assert!(err.to_string().contains("failed to read graph"));
    }
}
