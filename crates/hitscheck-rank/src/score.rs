//! Numeric bound for score vectors.

use std::fmt::{Debug, Display};

use hitscheck_core::config::Precision;
use num_traits::Float;

/// Floating-point type usable as a hub/authority score.
///
/// Implemented for `f32` and `f64`.
pub trait Score: Float + Debug + Display + Default + Send + Sync + 'static {
    /// Precision name recorded in run statistics.
    const PRECISION: Precision;

    /// Widen to `f64` for comparison and reporting.
    fn as_f64(self) -> f64;
}

impl Score for f32 {
    const PRECISION: Precision = Precision::Single;

    fn as_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Score for f64 {
    const PRECISION: Precision = Precision::Double;

    fn as_f64(self) -> f64 {
        self
    }
}
