//! Immutable configuration for a single validation run.
//!
//! A [`RunConfig`] is built once (defaults, then an optional TOML file,
//! then command-line overrides) and passed by reference to every component.
//! Nothing mutates it once a run has started.
//!
//! ```toml
//! max_iterations = 50
//! error_threshold = 0.05
//! compare_authorities = true
//!
//! [devices]
//! ids = [0, 1]
//!
//! [partition]
//! policy = "edge-balanced"
//! factor = 2
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::VertexId;

/// Default number of HITS rounds.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;
/// Default relative-error threshold.
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.05;
/// Default value of the opaque engine `delta` knob.
pub const DEFAULT_DELTA: f64 = 0.85;
/// Default number of entries in each top-K table.
pub const DEFAULT_TOP_K: usize = 10;

/// Invalid configuration values or unreadable configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_iterations must be > 0")]
    ZeroIterations,

    #[error("error_threshold must be finite and > 0, got {0}")]
    InvalidThreshold(f64),

    #[error("delta must be finite, got {0}")]
    InvalidDelta(f64),

    #[error("at least one device id is required")]
    NoDevices,

    #[error("device id {0} is listed more than once")]
    DuplicateDevice(usize),

    #[error("partition factor must be >= 1")]
    ZeroPartitionFactor,

    #[error("unknown {field} value '{value}' (expected one of: {expected})")]
    UnknownValue {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Floating-point width used for score vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// `f32` scores.
    Single,
    /// `f64` scores.
    #[default]
    Double,
}

impl Precision {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "f32" => Ok(Self::Single),
            "double" | "f64" => Ok(Self::Double),
            _ => Err(ConfigError::UnknownValue {
                field: "precision",
                value: s.to_string(),
                expected: "single, double",
            }),
        }
    }
}

/// How an engine splits the vertex range across devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionPolicy {
    /// Equal-sized contiguous vertex ranges.
    #[default]
    Contiguous,
    /// Contiguous ranges holding roughly equal numbers of arcs.
    EdgeBalanced,
    /// Each vertex assigned to a pseudo-random part (seeded).
    Random,
}

impl PartitionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contiguous => "contiguous",
            Self::EdgeBalanced => "edge-balanced",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for PartitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contiguous" => Ok(Self::Contiguous),
            "edge-balanced" | "edge_balanced" => Ok(Self::EdgeBalanced),
            "random" => Ok(Self::Random),
            _ => Err(ConfigError::UnknownValue {
                field: "partition policy",
                value: s.to_string(),
                expected: "contiguous, edge-balanced, random",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_ids")]
    pub ids: Vec<usize>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            ids: default_device_ids(),
        }
    }
}

impl DeviceConfig {
    #[must_use]
    pub fn count(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    #[serde(default)]
    pub policy: PartitionPolicy,
    /// Parts per device.
    #[serde(default = "default_partition_factor")]
    pub factor: usize,
    /// Seed for [`PartitionPolicy::Random`].
    #[serde(default)]
    pub seed: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            policy: PartitionPolicy::default(),
            factor: default_partition_factor(),
            seed: 0,
        }
    }
}

/// Inputs to one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_error_threshold")]
    pub error_threshold: f64,
    /// Skip the reference computation and the comparison.
    #[serde(default)]
    pub quick: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
    /// Validate authority scores as well as hub scores.
    #[serde(default = "default_true")]
    pub compare_authorities: bool,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Opaque knob forwarded to the engine's reset call.
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Opaque source vertex forwarded to the engine's reset call.
    #[serde(default)]
    pub source: Option<VertexId>,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default)]
    pub devices: DeviceConfig,
    #[serde(default)]
    pub partition: PartitionConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            error_threshold: default_error_threshold(),
            quick: false,
            verbose: false,
            quiet: false,
            compare_authorities: default_true(),
            top_k: default_top_k(),
            delta: default_delta(),
            source: None,
            precision: Precision::default(),
            devices: DeviceConfig::default(),
            partition: PartitionConfig::default(),
        }
    }
}

impl RunConfig {
    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if !self.error_threshold.is_finite() || self.error_threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(self.error_threshold));
        }
        if !self.delta.is_finite() {
            return Err(ConfigError::InvalidDelta(self.delta));
        }
        if self.devices.ids.is_empty() {
            return Err(ConfigError::NoDevices);
        }
        let mut seen = BTreeSet::new();
        for &id in &self.devices.ids {
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateDevice(id));
            }
        }
        if self.partition.factor == 0 {
            return Err(ConfigError::ZeroPartitionFactor);
        }
        Ok(())
    }

    /// Parse a configuration from TOML text. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] (with `path` set to `<inline>`) on
    /// malformed TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }
}

/// Load a [`RunConfig`] from a TOML file.
///
/// # Errors
///
/// Returns [`ConfigError::Read`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not valid TOML for a run configuration.
pub fn load_run_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str::<RunConfig>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

const fn default_true() -> bool {
    true
}

const fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

const fn default_error_threshold() -> f64 {
    DEFAULT_ERROR_THRESHOLD
}

const fn default_delta() -> f64 {
    DEFAULT_DELTA
}

const fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

const fn default_partition_factor() -> usize {
    1
}

fn default_device_ids() -> Vec<usize> {
    vec![0]
}
