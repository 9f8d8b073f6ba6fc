#![forbid(unsafe_code)]
//! hitscheck-rank library.
//!
//! Sequential reference implementation of HITS and the top-K reporter used
//! to print rankings. Both are generic over [`Score`], so callers pick
//! `f32` or `f64`.

pub mod hits;
pub mod score;
pub mod topk;

pub use hits::{RankVectors, reference_hits, reference_rank};
pub use score::Score;
pub use topk::{RankedVertex, render_top_k, top_k};
