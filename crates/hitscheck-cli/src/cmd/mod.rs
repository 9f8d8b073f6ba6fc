//! Subcommand handlers and the flags they share.

pub mod completions;
pub mod run;
pub mod sweep;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hitscheck_core::config::{PartitionPolicy, Precision, RunConfig, load_run_config};

/// Run-configuration flags shared by `run` and `sweep`.
///
/// Values are layered: defaults, then `--config`, then any flag given here.
#[derive(Args, Debug, Default)]
pub struct RunFlags {
    /// TOML run configuration; flags override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of HITS rounds.
    #[arg(long = "max-iter", value_name = "N")]
    pub max_iterations: Option<usize>,

    /// Relative-error threshold for the comparison.
    #[arg(long, value_name = "T")]
    pub error_threshold: Option<f64>,

    /// Skip the reference computation and the comparison.
    #[arg(long)]
    pub quick: bool,

    /// Suppress the run narrative (the statistics record is still printed).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print divergence windows and top-K tables.
    #[arg(short, long)]
    pub verbose: bool,

    /// Compare hub scores only.
    #[arg(long)]
    pub hub_only: bool,

    /// Entries per top-K table.
    #[arg(long, value_name = "K")]
    pub top_k: Option<usize>,

    /// Opaque `delta` value passed to the engine.
    #[arg(long)]
    pub delta: Option<f64>,

    /// Opaque source vertex passed to the engine.
    #[arg(long, value_name = "VERTEX")]
    pub source: Option<usize>,

    /// Device id to run on (repeatable).
    #[arg(long = "device", value_name = "ID")]
    pub devices: Vec<usize>,

    /// Partition policy: contiguous, edge-balanced, or random.
    #[arg(long, value_name = "POLICY")]
    pub partition: Option<PartitionPolicy>,

    /// Parts per device.
    #[arg(long, value_name = "N")]
    pub partition_factor: Option<usize>,

    /// Seed for the random partition policy.
    #[arg(long, value_name = "SEED")]
    pub partition_seed: Option<u64>,

    /// Score precision: single (f32) or double (f64).
    #[arg(long)]
    pub precision: Option<Precision>,
}

impl RunFlags {
    /// Build and validate the effective [`RunConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the merged
    /// configuration is invalid.
    pub fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => load_run_config(path)?,
            None => RunConfig::default(),
        };
        self.apply(&mut config);
        config.validate().context("invalid run configuration")?;
        Ok(config)
    }

    fn apply(&self, config: &mut RunConfig) {
        if let Some(n) = self.max_iterations {
            config.max_iterations = n;
        }
        if let Some(t) = self.error_threshold {
            config.error_threshold = t;
        }
        config.quick |= self.quick;
        config.quiet |= self.quiet;
        config.verbose |= self.verbose;
        if self.hub_only {
            config.compare_authorities = false;
        }
        if let Some(k) = self.top_k {
            config.top_k = k;
        }
        if let Some(delta) = self.delta {
            config.delta = delta;
        }
        if self.source.is_some() {
            config.source = self.source;
        }
        if !self.devices.is_empty() {
            config.devices.ids.clone_from(&self.devices);
        }
        if let Some(policy) = self.partition {
            config.partition.policy = policy;
        }
        if let Some(factor) = self.partition_factor {
            config.partition.factor = factor;
        }
        if let Some(seed) = self.partition_seed {
            config.partition.seed = seed;
        }
        if let Some(precision) = self.precision {
            config.precision = precision;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_flags_gives_defaults() {
        let config = RunFlags::default().resolve().expect("valid");
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "max_iterations = 5\ntop_k = 3\n[devices]\nids = [1]").expect("write");

        let flags = RunFlags {
            config: Some(file.path().to_path_buf()),
            top_k: Some(7),
            hub_only: true,
            devices: vec![0, 2],
            partition: Some(PartitionPolicy::Random),
            ..RunFlags::default()
        };
        let config = flags.resolve().expect("valid");
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.top_k, 7);
        assert!(!config.compare_authorities);
        assert_eq!(config.devices.ids, vec![0, 2]);
        assert_eq!(config.partition.policy, PartitionPolicy::Random);
    }

    #[test]
    fn invalid_merge_is_rejected() {
        let flags = RunFlags {
            error_threshold: Some(0.0),
            ..RunFlags::default()
        };
        let err = flags.resolve().expect_err("zero threshold");
        assert!(format!("{err:#}").contains("error_threshold"));
    }
}
