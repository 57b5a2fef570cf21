//! Campaign plans
//!
//! A plan binds a campaign kind and capture to the grid it sweeps, the
//! argument list of each point, and the artifacts each invocation leaves
//! behind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactRole, ArtifactSpec, Retention};
use crate::config::{CampaignConfig, ConfigError, RepetitionMode};
use crate::grid::{ExperimentPoint, Mode, ParameterGrid};

const TXN_LATENCY_FILE: &str = "txn_latencies.txt";
const SYSTEM_LATENCY_FILE: &str = "system_latencies.txt";
const CLIENT_LATENCY_FILE: &str = "client_latencies.txt";

/// Which sweep to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    /// Sweep substitution thresholds
    CacheLocality,
    /// Sweep blind-write frequencies at fixed thresholds
    BlindWrite,
}

impl CampaignKind {
    pub fn name(&self) -> &'static str {
        match self {
            CampaignKind::CacheLocality => "cache-locality",
            CampaignKind::BlindWrite => "blind-write",
        }
    }

    /// Archive directory used when none is given
    pub fn default_archive_dir(&self, capture: Capture) -> &'static str {
        match (self, capture) {
            (_, Capture::ClientLatency) => "client",
            (CampaignKind::CacheLocality, Capture::Throughput) => "final",
            (CampaignKind::BlindWrite, Capture::Throughput) => "blind",
        }
    }
}

impl FromStr for CampaignKind {
    type Err = String;

    /// Accepts the numeric campaign ids as well as their names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "cache" | "cache-locality" => Ok(CampaignKind::CacheLocality),
            "1" | "blind" | "blind-write" => Ok(CampaignKind::BlindWrite),
            other => Err(format!(
                "unknown campaign '{}', expected 0 (cache) or 1 (blind)",
                other
            )),
        }
    }
}

impl fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the workload measures (`--experiment`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capture {
    /// Throughput plus transaction/system latency CDFs
    Throughput,
    /// Client-observed latency CDF
    ClientLatency,
}

impl Capture {
    pub fn experiment_flag(&self) -> u8 {
        match self {
            Capture::Throughput => 0,
            Capture::ClientLatency => 1,
        }
    }
}

/// A fully resolved campaign
#[derive(Debug, Clone)]
pub struct CampaignPlan {
    kind: CampaignKind,
    capture: Capture,
    config: CampaignConfig,
    grid: ParameterGrid,
}

impl CampaignPlan {
    /// Validate `config` and build the grid for `kind` and `capture`
    pub fn new(
        kind: CampaignKind,
        capture: Capture,
        config: CampaignConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let grid = match (kind, capture) {
            (CampaignKind::CacheLocality, Capture::Throughput) => {
                ParameterGrid::single_axis(&config.thresholds, config.period, config.repetitions)
                    .with_baseline(
                        ExperimentPoint::eager(config.eager_threshold),
                        config.repetitions,
                    )
            }
            (CampaignKind::BlindWrite, Capture::Throughput) => ParameterGrid::cross_product(
                &config.blind_thresholds,
                &config.blind_frequencies,
                config.period,
                config.repetitions,
            )
            .with_baseline(
                ExperimentPoint::eager(config.eager_threshold)
                    .with_blind_frequency(config.eager_blind_frequency),
                config.repetitions,
            ),
            (CampaignKind::CacheLocality, Capture::ClientLatency) => ParameterGrid::single_axis(
                &config.client_thresholds,
                config.period,
                config.client_repetitions,
            ),
            (CampaignKind::BlindWrite, Capture::ClientLatency) => ParameterGrid::cross_product(
                &[config.client_blind_threshold],
                &config.blind_frequencies,
                config.period,
                config.client_repetitions,
            ),
        };

        Ok(Self {
            kind,
            capture,
            config,
            grid,
        })
    }

    pub fn kind(&self) -> CampaignKind {
        self.kind
    }

    pub fn capture(&self) -> Capture {
        self.capture
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    pub fn grid(&self) -> &ParameterGrid {
        &self.grid
    }

    pub fn repetition_mode(&self) -> RepetitionMode {
        self.config.repetition_mode
    }

    /// Standard deviation of the normal key distribution, `None` for uniform
    ///
    /// The blind-write client-latency sweep has its own setting.
    pub fn normal_std_dev(&self) -> Option<u32> {
        match (self.kind, self.capture) {
            (CampaignKind::BlindWrite, Capture::ClientLatency) => {
                self.config.client_blind_normal_std_dev
            }
            _ => self.config.workload.normal_std_dev,
        }
    }

    /// Workload argument list for `point`
    pub fn arguments(&self, point: &ExperimentPoint) -> Result<Vec<String>, ConfigError> {
        let workload = &self.config.workload;
        let mut args = Vec::with_capacity(22);

        match (point.mode, point.period) {
            (Mode::Lazy, Some(period)) => push_flag(&mut args, "--period", period),
            (Mode::Lazy, None) => return Err(ConfigError::MissingPeriod(point.threshold)),
            (Mode::Eager, _) => {}
        }

        push_flag(&mut args, "--num_workers", workload.num_workers);
        push_flag(&mut args, "--num_reads", workload.num_reads);
        push_flag(&mut args, "--num_writes", workload.num_writes);
        push_flag(&mut args, "--num_records", workload.num_records);
        push_flag(&mut args, "--num_txns", workload.num_txns);
        push_flag(&mut args, "--sub_threshold", point.threshold);
        if let Some(std_dev) = self.normal_std_dev() {
            push_flag(&mut args, "--normal", std_dev);
        }
        push_flag(&mut args, "--num_runs", 1);
        push_flag(&mut args, "--experiment", self.capture.experiment_flag());
        if let Some(freq) = point.blind_frequency {
            push_flag(&mut args, "--blind_writes", freq);
        }

        Ok(args)
    }

    /// Artifacts one invocation of `point` is expected to write
    pub fn artifacts(&self, point: &ExperimentPoint) -> Vec<ArtifactSpec> {
        let label = point.label();
        match self.capture {
            Capture::Throughput => {
                let throughput = point.throughput_file_name(self.normal_std_dev());
                let mut specs = vec![ArtifactSpec::new(
                    ArtifactRole::Throughput,
                    throughput.clone(),
                    throughput,
                    Retention::Append,
                )];
                if self.kind == CampaignKind::CacheLocality {
                    specs.push(ArtifactSpec::new(
                        ArtifactRole::TxnLatency,
                        TXN_LATENCY_FILE,
                        format!("{}_txn_latency.txt", label),
                        Retention::Truncate,
                    ));
                }
                specs.push(ArtifactSpec::new(
                    ArtifactRole::SysLatency,
                    SYSTEM_LATENCY_FILE,
                    format!("{}_sys_latency.txt", label),
                    Retention::Truncate,
                ));
                specs
            }
            Capture::ClientLatency => vec![ArtifactSpec::new(
                ArtifactRole::ClientLatency,
                CLIENT_LATENCY_FILE,
                client_archive_name(point),
                Retention::Truncate,
            )],
        }
    }

    /// Whether `spec` is claimed after every repetition
    pub fn harvest_per_repetition(&self, spec: &ArtifactSpec) -> bool {
        spec.retention == Retention::Truncate
            || self.config.repetition_mode == RepetitionMode::Independent
    }

    /// Archive name for the artifact of one repetition, or of the whole
    /// batch when `repetition` is `None`
    pub fn archive_name(
        &self,
        spec: &ArtifactSpec,
        repetition: Option<usize>,
        repetitions: usize,
    ) -> String {
        if repetitions > 1 && self.harvest_per_repetition(spec) {
            spec.archive_name_for(repetition)
        } else {
            spec.archive_name_for(None)
        }
    }

    /// Every archive name a completed group produces for `spec`, in
    /// repetition order
    pub fn archive_names(&self, spec: &ArtifactSpec, repetitions: usize) -> Vec<String> {
        if repetitions > 1 && self.harvest_per_repetition(spec) {
            (0..repetitions)
                .map(|rep| spec.archive_name_for(Some(rep)))
                .collect()
        } else {
            vec![spec.archive_name_for(None)]
        }
    }
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: impl ToString) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

fn client_archive_name(point: &ExperimentPoint) -> String {
    let prefix = match point.mode {
        Mode::Lazy => "",
        Mode::Eager => "eager_",
    };
    match (point.mode, point.blind_frequency) {
        (Mode::Lazy, None) => format!("lazy_threshold_{}.txt", point.threshold),
        (_, Some(freq)) => format!("{}threshold_{}_freq_{}.txt", prefix, point.threshold, freq),
        (Mode::Eager, None) => format!("eager_threshold_{}.txt", point.threshold),
    }
}
