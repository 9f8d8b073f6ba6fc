//! Element-wise comparison of engine output against the reference.
//!
//! # Tolerance policy
//!
//! For each index `i`, with `c` the computed score, `r` the reference score
//! and `t` the threshold:
//!
//! 1. `c == r`: match.
//! 2. `|c| < 0.01` and `|r - 1| < 0.01`: match. This tolerates a vertex the
//!    engine left at zero while the reference converged to exactly one.
//! 3. `|c| < 0.01`: mismatch iff `|c - r| > t` (absolute error near zero).
//! 4. Otherwise: mismatch iff `|(c - r) / r| > t` (relative error).
//!
//! A NaN difference never passes a threshold, so any NaN on either side is
//! a mismatch, including NaN against NaN.

use std::io::{self, Write};

use hitscheck_rank::Score;

/// Magnitude below which a computed score is treated as "near zero".
pub const NEAR_ZERO: f64 = 0.01;

/// Half-width of the context window printed around the first divergence.
pub const WINDOW_RADIUS: usize = 5;

/// Whether one computed/reference pair fails the tolerance policy.
#[must_use]
pub fn is_mismatch<S: Score>(computed: S, reference: S, threshold: f64) -> bool {
    if computed == reference {
        return false;
    }

    let c = computed.as_f64();
    let r = reference.as_f64();
    if c.abs() < NEAR_ZERO {
        if (r - 1.0).abs() < NEAR_ZERO {
            return false;
        }
        return exceeds((c - r).abs(), threshold);
    }
    exceeds(((c - r) / r).abs(), threshold)
}

fn exceeds(error: f64, threshold: f64) -> bool {
    error.is_nan() || error > threshold
}

/// The first failing index, with surrounding context.
#[derive(Debug, Clone, PartialEq)]
pub struct Divergence<S> {
    pub index: usize,
    pub computed: S,
    pub reference: S,
    /// Index of the first element of each window.
    pub window_start: usize,
    pub computed_window: Vec<S>,
    pub reference_window: Vec<S>,
}

/// Outcome of comparing one pair of vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison<S> {
    /// Number of failing indices.
    pub mismatches: usize,
    /// Number of indices compared.
    pub len: usize,
    pub first: Option<Divergence<S>>,
}

impl<S: Score> Comparison<S> {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.mismatches == 0
    }

    /// Write the divergence report for the vector named `label`.
    ///
    /// Prints nothing on a pass. Otherwise prints the first divergence and,
    /// when `verbose`, the windows of both vectors around it.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn report(&self, out: &mut dyn Write, label: &str, verbose: bool) -> io::Result<()> {
        let Some(first) = &self.first else {
            return Ok(());
        };

        writeln!(
            out,
            "{label}: first divergence at index {}: computed {}, reference {} ({} of {} mismatched)",
            first.index, first.computed, first.reference, self.mismatches, self.len
        )?;

        if verbose {
            writeln!(out, "{:>10} {:>16} {:>16}", "index", "computed", "reference")?;
            for (offset, (c, r)) in first
                .computed_window
                .iter()
                .zip(&first.reference_window)
                .enumerate()
            {
                let index = first.window_start + offset;
                let marker = if index == first.index { " <" } else { "" };
                writeln!(
                    out,
                    "{index:>10} {:>16.10} {:>16.10}{marker}",
                    c.as_f64(),
                    r.as_f64()
                )?;
            }
        }
        Ok(())
    }
}

/// Compare `computed` against `reference` index by index.
///
/// # Panics
///
/// Panics if the two slices differ in length.
#[must_use]
pub fn compare_scores<S: Score>(computed: &[S], reference: &[S], threshold: f64) -> Comparison<S> {
    assert_eq!(
        computed.len(),
        reference.len(),
        "computed and reference vectors must have equal length"
    );

    let mut mismatches = 0;
    let mut first = None;
    for (index, (&c, &r)) in computed.iter().zip(reference).enumerate() {
        if !is_mismatch(c, r, threshold) {
            continue;
        }
        mismatches += 1;
        if first.is_none() {
            let window_start = index.saturating_sub(WINDOW_RADIUS);
            let window_end = (index + WINDOW_RADIUS + 1).min(computed.len());
            first = Some(Divergence {
                index,
                computed: c,
                reference: r,
                window_start,
                computed_window: computed[window_start..window_end].to_vec(),
                reference_window: reference[window_start..window_end].to_vec(),
            });
        }
    }

    Comparison {
        mismatches,
        len: computed.len(),
        first,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_vectors_pass() {
        let v = [0.5_f64, 0.25, 0.0, 1.0];
        let cmp = compare_scores(&v, &v, 0.05);
        assert!(cmp.passed());
        assert_eq!(cmp.len, 4);
        assert!(cmp.first.is_none());
    }

    #[test]
    fn relative_branch() {
        assert!(!is_mismatch(0.52_f64, 0.5, 0.05));
        assert!(is_mismatch(0.56_f64, 0.5, 0.05));
        assert!(is_mismatch(-0.5_f64, 0.5, 0.05));
    }

    #[test]
    fn absolute_branch_near_zero() {
        assert!(!is_mismatch(0.001_f64, 0.03, 0.05));
        assert!(is_mismatch(0.001_f64, 0.2, 0.05));
    }

    #[test]
    fn zero_against_one_is_carved_out() {
        assert!(!is_mismatch(0.005_f64, 1.003, 0.05));
        assert!(!is_mismatch(0.0_f32, 1.0, 0.001));
        // Carve-out only applies with the reference at one.
        assert!(is_mismatch(0.005_f64, 0.9, 0.05));
    }

    #[test]
    fn nan_handling() {
        assert!(is_mismatch(f64::NAN, f64::NAN, 0.05));
        assert!(is_mismatch(f32::NAN, f32::NAN, 1.0));
        assert!(is_mismatch(0.0_f64, f64::NAN, 0.05));
        assert!(is_mismatch(f64::NAN, 0.5, 0.05));
        assert!(is_mismatch(0.5, f64::NAN, 0.05));
        // Relative error against a zero reference is infinite.
        assert!(is_mismatch(0.5_f64, 0.0, 0.05));
    }

    #[test]
    fn counts_every_mismatch_but_reports_the_first() {
        let reference = [0.5_f64, 0.5, 0.5, 0.5];
        let computed = [0.5_f64, 0.9, 0.5, 0.1];
        let cmp = compare_scores(&computed, &reference, 0.05);
        assert_eq!(cmp.mismatches, 2);
        assert!(!cmp.passed());
        let first = cmp.first.expect("a divergence");
        assert_eq!(first.index, 1);
        assert_eq!(first.window_start, 0);
        assert_eq!(first.computed_window.len(), 4);
    }

    #[test]
    fn window_is_clamped_to_bounds() {
        let reference = vec![0.5_f64; 20];
        let mut computed = reference.clone();
        computed[12] = 0.9;
        let first = compare_scores(&computed, &reference, 0.05)
            .first
            .expect("a divergence");
        assert_eq!(first.window_start, 7);
        assert_eq!(first.computed_window.len(), 11);

        computed[12] = 0.5;
        computed[18] = 0.9;
        let first = compare_scores(&computed, &reference, 0.05)
            .first
            .expect("a divergence");
        assert_eq!(first.window_start, 13);
        assert_eq!(first.reference_window.len(), 7);
    }

    #[test]
    fn report_prints_window_only_when_verbose() {
        let cmp = compare_scores(&[0.5_f64, 0.9], &[0.5, 0.5], 0.05);

        let mut terse = Vec::new();
        cmp.report(&mut terse, "hubs", false).expect("write");
        let terse = String::from_utf8(terse).expect("utf8");
        assert_eq!(terse.lines().count(), 1);
        assert!(terse.starts_with("hubs: first divergence at index 1"));
        assert!(terse.contains("1 of 2 mismatched"));

        let mut full = Vec::new();
        cmp.report(&mut full, "hubs", true).expect("write");
        let full = String::from_utf8(full).expect("utf8");
        assert_eq!(full.lines().count(), 4);
        assert!(full.lines().last().is_some_and(|l| l.ends_with(" <")));
    }

    #[test]
    fn passing_report_is_silent() {
        let cmp = compare_scores(&[0.5_f64], &[0.5], 0.05);
        let mut out = Vec::new();
        cmp.report(&mut out, "hubs", true).expect("write");
        assert!(out.is_empty());
    }

    #[test]
    fn degenerate_vectors_fail() {
        let nan = [f64::NAN; 4];
        let cmp = compare_scores(&nan, &nan, 0.05);
        assert_eq!(cmp.mismatches, 4);
        assert!(!cmp.passed());
        assert_eq!(cmp.first.as_ref().map(|d| d.index), Some(0));
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn length_mismatch_panics() {
        let _ = compare_scores(&[0.5_f64], &[0.5, 0.5], 0.05);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn comparison_is_reflexive(
            values in prop::collection::vec(
                prop::num::f64::POSITIVE | prop::num::f64::NEGATIVE | prop::num::f64::ZERO,
                0..50,
            ),
        ) {
            let cmp = compare_scores(&values, &values, 0.05);
            prop_assert_eq!(cmp.mismatches, 0);
        }

        #[test]
        fn raising_threshold_never_adds_mismatches(
            pairs in prop::collection::vec((-2.0_f64..2.0, -2.0_f64..2.0), 1..50),
            low in 0.001_f64..0.5,
            extra in 0.0_f64..0.5,
        ) {
            let (computed, reference): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let tight = compare_scores(&computed, &reference, low);
            let loose = compare_scores(&computed, &reference, low + extra);
            prop_assert!(loose.mismatches <= tight.mismatches);
        }
    }
}
