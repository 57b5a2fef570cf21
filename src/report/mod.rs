//! Campaign reports
//!
//! Turns the archive of a finished campaign into throughput summaries and
//! comparative charts. A series whose archive cannot be aggregated is left
//! out and reported; the rest of the chart is still drawn.

mod charts;

pub use charts::{ChartError, ReportCharts};

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::artifact::ArtifactRole;
use crate::campaign::{CampaignKind, CampaignPlan, Capture};
use crate::error::{HarnessError, Result};
use crate::grid::{ExperimentPoint, Mode, PointGroup};
use crate::metrics::{
    self, compute_throughput_stats, pool_throughput_stats, per_repetition_stats, AggregateStat,
    CdfSeries,
};

/// Throughput of one experiment point
#[derive(Debug, Clone, Serialize)]
pub struct ThroughputSummary {
    pub label: String,
    pub mode: Mode,
    pub threshold: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blind_frequency: Option<u32>,
    /// Position on the campaign's configuration axis
    pub axis_value: f64,
    pub stat: AggregateStat,
    pub per_repetition: Vec<AggregateStat>,
    pub archives: Vec<PathBuf>,
}

impl ThroughputSummary {
    pub fn repetitions(&self) -> usize {
        self.per_repetition.len()
    }
}

/// A series that could not be aggregated
#[derive(Debug)]
pub struct SeriesFailure {
    /// Chart or summary the series belongs to
    pub chart: String,
    pub series: String,
    pub error: HarnessError,
}

/// Aggregates and charts the archive of one campaign plan
pub struct CampaignReport<'a> {
    plan: &'a CampaignPlan,
    archive_dir: PathBuf,
}

impl<'a> CampaignReport<'a> {
    pub fn new(plan: &'a CampaignPlan, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            plan,
            archive_dir: archive_dir.into(),
        }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Position of `point` on the swept axis
    pub fn axis_value(&self, point: &ExperimentPoint) -> f64 {
        match self.plan.kind() {
            CampaignKind::CacheLocality => point.threshold as f64,
            CampaignKind::BlindWrite => point.blind_frequency.unwrap_or(0) as f64,
        }
    }

    /// Archive paths of `role` for a group, in repetition order
    fn archives(&self, group: &PointGroup, role: ArtifactRole) -> Vec<PathBuf> {
        self.plan
            .artifacts(&group.point)
            .iter()
            .filter(|spec| spec.role == role)
            .flat_map(|spec| self.plan.archive_names(spec, group.repetitions))
            .map(|name| self.archive_dir.join(name))
            .collect()
    }

    /// Throughput summaries of every point, in grid order
    ///
    /// Empty for the client-latency capture, which records no throughput.
    /// Bad or missing data leaves out one series; any other error ends the
    /// summary.
    pub fn throughput_summaries(&self) -> Result<(Vec<ThroughputSummary>, Vec<SeriesFailure>)> {
        let mut summaries = Vec::new();
        let mut failures = Vec::new();
        if self.plan.capture() != Capture::Throughput {
            return Ok((summaries, failures));
        }

        for group in self.plan.grid().iter() {
            match self.throughput_summary(group) {
                Ok(summary) => summaries.push(summary),
                Err(error) if !error.is_series_local() => return Err(error),
                Err(error) => {
                    warn!(point = %group.point, error = %error, "Skipping throughput series");
                    failures.push(SeriesFailure {
                        chart: "summary".to_string(),
                        series: group.point.label(),
                        error,
                    });
                }
            }
        }
        Ok((summaries, failures))
    }

    fn throughput_summary(&self, group: &PointGroup) -> Result<ThroughputSummary> {
        let archives = self.archives(group, ArtifactRole::Throughput);

        let (stat, per_repetition) = match archives.as_slice() {
            [pooled] => {
                let stat = compute_throughput_stats(pooled)?;
                let per_repetition = metrics::read_throughput_samples(pooled)?
                    .iter()
                    .filter_map(|s| AggregateStat::from_values(&[s.throughput()]))
                    .collect();
                (stat, per_repetition)
            }
            files => {
                let stat = pool_throughput_stats(files)?.ok_or_else(|| {
                    HarnessError::MissingArtifact {
                        path: self.archive_dir.clone(),
                    }
                })?;
                (stat, per_repetition_stats(files)?)
            }
        };

        Ok(ThroughputSummary {
            label: group.point.label(),
            mode: group.point.mode,
            threshold: group.point.threshold,
            blind_frequency: group.point.blind_frequency,
            axis_value: self.axis_value(&group.point),
            stat,
            per_repetition,
            archives,
        })
    }

    /// CDF of the final repetition of a group's `role` artifact
    fn final_cdf(&self, group: &PointGroup, role: ArtifactRole, divisor: f64) -> Result<CdfSeries> {
        let archives = self.archives(group, role);
        let last = archives.last().ok_or_else(|| HarnessError::MissingArtifact {
            path: self.archive_dir.join(format!("{}_{:?}", group.point.label(), role)),
        })?;
        metrics::build_cdf(last, divisor)
    }
}
