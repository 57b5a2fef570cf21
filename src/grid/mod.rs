//! Experiment points and the parameter grid
//!
//! A grid is an ordered list of (point, repetitions) groups:
//! - **Single-axis**: one lazy point per substitution threshold
//! - **Cross-product**: one lazy point per (threshold, blind frequency)
//!
//! Either shape may carry one eager baseline group, appended last.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Workload execution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Defers substitution behind a threshold and period
    Lazy,
    /// Substitutes immediately (baseline)
    Eager,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Lazy => f.write_str("lazy"),
            Mode::Eager => f.write_str("eager"),
        }
    }
}

/// One workload configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentPoint {
    pub mode: Mode,
    /// Substitution threshold; a sentinel for eager points
    pub threshold: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blind_frequency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
}

impl ExperimentPoint {
    /// A lazy point substituting every `period` transactions
    pub fn lazy(threshold: u32, period: u32) -> Self {
        Self {
            mode: Mode::Lazy,
            threshold,
            blind_frequency: None,
            period: Some(period),
        }
    }

    /// An eager point; `sentinel` is passed as the threshold but unused
    pub fn eager(sentinel: u32) -> Self {
        Self {
            mode: Mode::Eager,
            threshold: sentinel,
            blind_frequency: None,
            period: None,
        }
    }

    /// Enable blind writes at the given frequency
    pub fn with_blind_frequency(mut self, frequency: u32) -> Self {
        self.blind_frequency = Some(frequency);
        self
    }

    /// Stable label used in archive names, logs, and chart legends
    ///
    /// Eager points omit the sentinel threshold.
    pub fn label(&self) -> String {
        let mut label = match self.mode {
            Mode::Lazy => format!("lazy_{}", self.threshold),
            Mode::Eager => "eager".to_string(),
        };
        if let Some(freq) = self.blind_frequency {
            label.push_str(&format!("_blind_{}", freq));
        }
        label
    }

    /// Name of the append-mode throughput file the workload writes for
    /// this point
    pub fn throughput_file_name(&self, normal_std_dev: Option<u32>) -> String {
        let mut name = match self.period {
            Some(period) => format!("lazy_{}_subst_threshold_{}", period, self.threshold),
            None => "eager".to_string(),
        };
        match normal_std_dev {
            Some(std_dev) => name.push_str(&format!("_normal_{}", std_dev)),
            None => name.push_str("_uniform"),
        }
        if let Some(freq) = self.blind_frequency {
            name.push_str(&format!("_blind_{}", freq));
        }
        name.push_str(".txt");
        name
    }
}

impl fmt::Display for ExperimentPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A point and how many times to run it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointGroup {
    pub point: ExperimentPoint,
    pub repetitions: usize,
}

/// Ordered experiment configurations
#[derive(Debug, Clone, Default)]
pub struct ParameterGrid {
    groups: Vec<PointGroup>,
}

impl ParameterGrid {
    /// One lazy point per threshold
    pub fn single_axis(thresholds: &[u32], period: u32, repetitions: usize) -> Self {
        let groups = thresholds
            .iter()
            .map(|&threshold| PointGroup {
                point: ExperimentPoint::lazy(threshold, period),
                repetitions,
            })
            .collect();
        Self { groups }
    }

    /// One lazy point per (threshold, frequency), threshold-major
    pub fn cross_product(
        thresholds: &[u32],
        frequencies: &[u32],
        period: u32,
        repetitions: usize,
    ) -> Self {
        let groups = thresholds
            .iter()
            .flat_map(|&threshold| {
                frequencies.iter().map(move |&freq| PointGroup {
                    point: ExperimentPoint::lazy(threshold, period).with_blind_frequency(freq),
                    repetitions,
                })
            })
            .collect();
        Self { groups }
    }

    /// Append a baseline group
    pub fn with_baseline(mut self, point: ExperimentPoint, repetitions: usize) -> Self {
        self.groups.push(PointGroup { point, repetitions });
        self
    }

    pub fn groups(&self) -> &[PointGroup] {
        &self.groups
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointGroup> {
        self.groups.iter()
    }

    /// Number of configuration groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total external invocations across all groups
    pub fn total_invocations(&self) -> usize {
        self.groups.iter().map(|g| g.repetitions).sum()
    }
}
