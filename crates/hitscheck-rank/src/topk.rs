//! Top-K selection for human-readable ranking output.

use std::cmp::Ordering;
use std::io::{self, Write};

use hitscheck_core::graph::VertexId;
use serde::Serialize;

use crate::score::Score;

/// A `(vertex, score)` pair produced for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedVertex<S> {
    pub vertex: VertexId,
    pub score: S,
}

impl<S: Score> RankedVertex<S> {
    /// Same entry with the score widened to `f64`.
    #[must_use]
    pub fn widen(self) -> RankedVertex<f64> {
        RankedVertex {
            vertex: self.vertex,
            score: self.score.as_f64(),
        }
    }
}

/// Descending order with NaN below every number, so the order is total.
fn descending<S: Score>(a: S, b: S) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// The `min(k, scores.len())` highest-scoring vertices, best first.
///
/// The sort is stable: vertices with equal scores appear in ascending id
/// order, so repeated runs print identical tables.
#[must_use]
pub fn top_k<S: Score>(scores: &[S], k: usize) -> Vec<RankedVertex<S>> {
    let mut ranked: Vec<RankedVertex<S>> = scores
        .iter()
        .enumerate()
        .map(|(vertex, &score)| RankedVertex { vertex, score })
        .collect();

    ranked.sort_by(|a, b| descending(a.score, b.score));
    ranked.truncate(k);
    ranked
}

/// Write a ranking table headed by `label`.
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn render_top_k<S: Score>(
    out: &mut dyn Write,
    label: &str,
    ranks: &[RankedVertex<S>],
) -> io::Result<()> {
    writeln!(out, "Top {} {label}:", ranks.len())?;
    writeln!(out, "{:>6} {:>10} {:>14}", "rank", "vertex", "score")?;
    for (i, entry) in ranks.iter().enumerate() {
        writeln!(
            out,
            "{:>6} {:>10} {:>14.8}",
            i + 1,
            entry.vertex,
            entry.score.as_f64()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertices<S>(ranks: &[RankedVertex<S>]) -> Vec<VertexId> {
        ranks.iter().map(|r| r.vertex).collect()
    }

    #[test]
    fn returns_highest_first() {
        let ranks = top_k(&[0.1_f64, 0.9, 0.5, 0.7], 3);
        assert_eq!(vertices(&ranks), vec![1, 3, 2]);
        assert!((ranks[0].score - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn fewer_vertices_than_k() {
        let ranks = top_k(&[0.3_f32, 0.2], 10);
        assert_eq!(vertices(&ranks), vec![0, 1]);
        assert!(top_k::<f64>(&[], 10).is_empty());
    }

    #[test]
    fn ties_keep_ascending_vertex_order() {
        let scores = [0.2_f64, 0.5, 0.1, 0.5, 0.5];
        let ranks = top_k(&scores, 4);
        assert_eq!(vertices(&ranks), vec![1, 3, 4, 0]);
    }

    #[test]
    fn nan_sorts_last() {
        let ranks = top_k(&[f64::NAN, 0.2, f64::NAN, 0.4], 4);
        assert_eq!(vertices(&ranks), vec![3, 1, 0, 2]);
    }

    #[test]
    fn widen_preserves_vertex() {
        let entry = RankedVertex {
            vertex: 4,
            score: 0.5_f32,
        };
        let wide = entry.widen();
        assert_eq!(wide.vertex, 4);
        assert!((wide.score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn render_writes_one_line_per_entry() {
        let ranks = top_k(&[0.25_f64, 0.75], 10);
        let mut buf = Vec::new();
        render_top_k(&mut buf, "hubs", &ranks).expect("write to vec");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Top 2 hubs:");
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("0.75000000"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn scores_never_increase(scores in prop::collection::vec(0.0_f64..10.0, 0..64), k in 0_usize..80) {
                let ranks = top_k(&scores, k);
                prop_assert_eq!(ranks.len(), k.min(scores.len()));
                for pair in ranks.windows(2) {
                    prop_assert!(pair[0].score >= pair[1].score);
                    if pair[0].score.total_cmp(&pair[1].score).is_eq() {
                        prop_assert!(pair[0].vertex < pair[1].vertex);
                    }
                }
            }
        }
    }
}
