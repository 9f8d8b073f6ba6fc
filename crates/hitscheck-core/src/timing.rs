use std::time::{Duration, Instant};

use serde_json::json;

/// Wall-clock stopwatch bracketing one phase of a run.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Return the elapsed time and restart from now.
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.started);
        self.started = now;
        elapsed
    }
}

/// Execute a closure and return its result with the elapsed wall time.
pub fn timed<R>(f: impl FnOnce() -> R) -> (R, Duration) {
    let started = Instant::now();
    let result = f();
    (result, started.elapsed())
}

/// Duration as fractional milliseconds, the unit of every statistics record.
#[must_use]
pub fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

/// Percentile summary over a batch of phase timings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LatencySummary {
    /// Number of samples.
    pub count: usize,
    /// 50th percentile latency.
    pub p50: Duration,
    /// 95th percentile latency.
    pub p95: Duration,
    /// Largest sample.
    pub max: Duration,
}

impl LatencySummary {
    /// Summarize a set of samples. Order does not matter.
    #[must_use]
    pub fn from_samples(samples: &[Duration]) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();

        Self {
            count: sorted.len(),
            p50: percentile(&sorted, 50),
            p95: percentile(&sorted, 95),
            max: sorted.last().copied().unwrap_or(Duration::ZERO),
        }
    }

    /// Render the summary as JSON with microsecond fields.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "count": self.count,
            "p50_us": self.p50.as_micros(),
            "p95_us": self.p95.as_micros(),
            "max_us": self.max.as_micros(),
        })
    }

    /// One-line human rendering, e.g. `n=20 p50=1.204ms p95=3.010ms max=4.500ms`.
    #[must_use]
    pub fn display_line(&self) -> String {
        format!(
            "n={} p50={} p95={} max={}",
            self.count,
            format_duration(self.p50),
            format_duration(self.p95),
            format_duration(self.max)
        )
    }
}

/// Nearest-rank percentile of an ascending slice.
fn percentile(sorted: &[Duration], pct: u32) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }

    let pct_usize = usize::try_from(pct).unwrap_or(100).min(100);
    let rank = pct_usize.saturating_mul(sorted.len()).saturating_add(99) / 100;
    let index = rank.saturating_sub(1).min(sorted.len().saturating_sub(1));

    sorted[index]
}

/// Format a duration with a unit suited to its magnitude.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();

    if micros >= 1_000_000 {
        let secs = micros / 1_000_000;
        let millis = (micros % 1_000_000) / 1_000;
        format!("{secs}.{millis:03}s")
    } else if micros >= 1_000 {
        let millis = micros / 1_000;
        let rem = micros % 1_000;
        format!("{millis}.{rem:03}ms")
    } else {
        format!("{micros}µs")
    }
}
