//! Campaign configuration types
//!
//! Every field has a default matching the published campaign, so a JSON
//! configuration file only needs to name what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Fixed workload flags shared by every invocation of a campaign
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Path to the workload binary
    pub binary: PathBuf,

    /// `--num_workers`
    pub num_workers: u32,

    /// `--num_reads`
    pub num_reads: u32,

    /// `--num_writes`
    pub num_writes: u32,

    /// `--num_records`
    pub num_records: u64,

    /// `--num_txns`
    pub num_txns: u64,

    /// `--normal`; `None` selects the uniform key distribution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal_std_dev: Option<u32>,

    /// Kill an invocation that runs longer than this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("build/lazy_db"),
            num_workers: 1,
            num_reads: 0,
            num_writes: 20,
            num_records: 1_000_000,
            num_txns: 10_000_000,
            normal_std_dev: Some(30),
            timeout_secs: None,
        }
    }
}

/// How repetitions of one experiment point are harvested and aggregated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RepetitionMode {
    /// The append-mode throughput file accumulates one line per repetition
    /// and is claimed once after the batch
    #[default]
    Pooled,
    /// Every artifact is claimed after every repetition into its own
    /// archive file
    Independent,
}

/// Campaign configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Fixed workload flags
    pub workload: WorkloadConfig,

    /// Directory the workload runs in and writes its fixed-name files to
    pub working_dir: PathBuf,

    /// Substitution thresholds swept by the cache-locality campaign
    pub thresholds: Vec<u32>,

    /// Threshold(s) held while the blind-write campaign sweeps frequencies
    pub blind_thresholds: Vec<u32>,

    /// Blind-write frequencies swept by the blind-write campaign
    pub blind_frequencies: Vec<u32>,

    /// Thresholds swept by the client-latency capture of the cache campaign
    pub client_thresholds: Vec<u32>,

    /// Threshold held by the client-latency capture of the blind campaign
    pub client_blind_threshold: u32,

    /// `--normal` for the client-latency capture of the blind campaign, in
    /// place of `workload.normal_std_dev`; `None` runs it uniform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_blind_normal_std_dev: Option<u32>,

    /// `--period` passed to every lazy point
    pub period: u32,

    /// Sentinel `--sub_threshold` passed to eager points
    pub eager_threshold: u32,

    /// Blind frequency of the eager baseline in the blind-write campaign
    pub eager_blind_frequency: u32,

    /// Repetitions per point for throughput/latency capture
    pub repetitions: usize,

    /// Repetitions per point for client-latency capture
    pub client_repetitions: usize,

    /// Pooled or independent repetitions
    pub repetition_mode: RepetitionMode,

    /// Divisor converting cycle counts to microseconds
    pub cycles_per_microsecond: f64,

    /// Divisor applied to client latency values
    pub client_latency_divisor: f64,

    /// Fixed (x, y) ranges of the cache-locality throughput chart; `None`
    /// derives the range from the data
    pub cache_throughput_x_limits: Option<(f64, f64)>,
    pub cache_throughput_y_limits: Option<(f64, f64)>,

    /// Fixed (x, y) ranges of the blind-write throughput chart; x is log
    pub blind_throughput_x_limits: Option<(f64, f64)>,
    pub blind_throughput_y_limits: Option<(f64, f64)>,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            workload: WorkloadConfig::default(),
            working_dir: PathBuf::from("."),
            thresholds: vec![50, 100, 150, 200, 250],
            blind_thresholds: vec![250],
            blind_frequencies: vec![2, 4, 8, 16, 32],
            client_thresholds: vec![50, 100, 150, 200, 250, 300],
            client_blind_threshold: 300,
            client_blind_normal_std_dev: None,
            period: 1000,
            eager_threshold: 300,
            eager_blind_frequency: 2,
            repetitions: 10,
            client_repetitions: 1,
            repetition_mode: RepetitionMode::Pooled,
            cycles_per_microsecond: 1996.0,
            client_latency_divisor: 1.0,
            cache_throughput_x_limits: Some((50.0, 250.0)),
            cache_throughput_y_limits: Some((250_000.0, 650_000.0)),
            blind_throughput_x_limits: Some((2.0, 32.0)),
            blind_throughput_y_limits: Some((250_000.0, 1_000_000.0)),
        }
    }
}

impl CampaignConfig {
    /// Load a configuration from a JSON file; absent fields keep defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Set the repetitions per point
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Set the repetition mode
    pub fn with_repetition_mode(mut self, mode: RepetitionMode) -> Self {
        self.repetition_mode = mode;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repetitions == 0 || self.client_repetitions == 0 {
            return Err(ConfigError::InvalidRepetitions);
        }
        if self.thresholds.is_empty() {
            return Err(ConfigError::EmptyAxis("thresholds"));
        }
        if self.blind_thresholds.is_empty() {
            return Err(ConfigError::EmptyAxis("blind_thresholds"));
        }
        if self.blind_frequencies.is_empty() {
            return Err(ConfigError::EmptyAxis("blind_frequencies"));
        }
        if self.client_thresholds.is_empty() {
            return Err(ConfigError::EmptyAxis("client_thresholds"));
        }
        if self.period == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        if self.workload.num_workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        if self.workload.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidTimeout);
        }
        check_divisor(self.cycles_per_microsecond)?;
        check_divisor(self.client_latency_divisor)?;

        check_limits("cache_throughput_x_limits", self.cache_throughput_x_limits, false)?;
        check_limits("cache_throughput_y_limits", self.cache_throughput_y_limits, false)?;
        check_limits("blind_throughput_x_limits", self.blind_throughput_x_limits, true)?;
        check_limits("blind_throughput_y_limits", self.blind_throughput_y_limits, false)?;
        Ok(())
    }
}

fn check_limits(name: &str, limits: Option<(f64, f64)>, log: bool) -> Result<(), ConfigError> {
    let Some((lo, hi)) = limits else {
        return Ok(());
    };
    if !(lo.is_finite() && hi.is_finite() && lo < hi) {
        return Err(ConfigError::InvalidLimits(format!(
            "{} [{}, {}] must be finite and increasing",
            name, lo, hi
        )));
    }
    if log && lo <= 0.0 {
        return Err(ConfigError::InvalidLimits(format!(
            "{} [{}, {}] must be positive on a log axis",
            name, lo, hi
        )));
    }
    Ok(())
}

/// Reject divisors that would produce infinite or negative scaled values
pub fn check_divisor(divisor: f64) -> Result<(), ConfigError> {
    if divisor.is_finite() && divisor > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDivisor(divisor))
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Zero repetitions
    #[error("repetitions must be at least 1")]
    InvalidRepetitions,

    /// A sweep axis with no values
    #[error("{0} must not be empty")]
    EmptyAxis(&'static str),

    /// Zero substitution period
    #[error("period must be greater than 0")]
    InvalidPeriod,

    /// Zero workers
    #[error("num_workers must be at least 1")]
    InvalidWorkers,

    /// Zero timeout
    #[error("timeout_secs must be greater than 0")]
    InvalidTimeout,

    /// Non-positive or non-finite divisor
    #[error("divisor must be a finite value greater than 0, got {0}")]
    InvalidDivisor(f64),

    /// Lazy point without a substitution period
    #[error("lazy point at threshold {0} has no period")]
    MissingPeriod(u32),

    /// Axis limits that cannot be drawn
    #[error("invalid plot limits: {0}")]
    InvalidLimits(String),

    /// Failed to parse JSON configuration
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
