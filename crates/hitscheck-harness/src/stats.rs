//! Statistics record produced by every validation run.

use hitscheck_rank::RankedVertex;
use serde::Serialize;

/// Summary of one run. Always returned, even when output is quiet.
///
/// Mismatch fields are `None` in quick mode, when no comparison ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub engine: String,
    pub precision: String,
    pub vertices: usize,
    pub arcs: usize,
    pub max_iterations: usize,
    pub error_threshold: f64,
    pub quick: bool,
    pub frontier: String,
    pub devices: Vec<usize>,
    pub reference_ms: Option<f64>,
    pub preprocess_ms: f64,
    pub compute_ms: f64,
    pub postprocess_ms: f64,
    pub total_ms: f64,
    pub hub_mismatches: Option<usize>,
    /// `None` when authorities were not compared.
    pub authority_mismatches: Option<usize>,
    /// Sum of every compared mismatch count.
    pub divergence: Option<usize>,
    pub passed: Option<bool>,
    pub top_hubs: Vec<RankedVertex<f64>>,
    pub top_authorities: Vec<RankedVertex<f64>>,
}

impl RunStats {
    /// True only when a comparison ran and found mismatches.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.passed == Some(false)
    }

    /// # Errors
    ///
    /// Returns a serialization error; in practice this cannot fail for
    /// this record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
