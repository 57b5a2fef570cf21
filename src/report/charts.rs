//! Chart layouts of each campaign

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{CampaignReport, SeriesFailure, ThroughputSummary};
use crate::artifact::ArtifactRole;
use crate::campaign::{CampaignKind, Capture};
use crate::grid::Mode;
use crate::visualization::{ComparativePlotBuilder, LegendPlacement, PlotOptions, XScale};

/// A chart whose file could not be drawn
#[derive(Debug)]
pub struct ChartError {
    pub chart: String,
    pub error: anyhow::Error,
}

/// Charts written for a campaign and the series left out of them
#[derive(Debug, Default)]
pub struct ReportCharts {
    pub rendered: Vec<PathBuf>,
    /// Charts without a single valid series
    pub skipped: Vec<String>,
    pub failures: Vec<SeriesFailure>,
    /// Charts that failed to render; the others are still drawn
    pub errors: Vec<ChartError>,
}

impl CampaignReport<'_> {
    /// Render every chart of the campaign into `out_dir`
    pub fn render_charts(
        &self,
        summaries: &[ThroughputSummary],
        out_dir: &Path,
    ) -> Result<ReportCharts> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create chart directory {}", out_dir.display()))?;

        let config = self.plan.config();
        let mut charts = Vec::new();

        match self.plan.capture() {
            Capture::Throughput => {
                charts.push((
                    "cache_throughput.png",
                    (self.throughput_chart(summaries), Vec::new()),
                ));
                if self.plan.kind() == CampaignKind::CacheLocality {
                    let options = PlotOptions::new("Transaction execution time")
                        .with_axis_labels("Execution time (cycles)", "CDF")
                        .with_x_scale(XScale::Log)
                        .with_x_limits(100.0, 10000.0)
                        .with_y_limits(0.0, 1.2)
                        .with_legend(LegendPlacement::LowerRight);
                    charts.push((
                        "txn_latency.png",
                        self.cdf_chart(
                            options,
                            ArtifactRole::TxnLatency,
                            1.0,
                            "txn_latency.png",
                        )?,
                    ));
                }
                let options = PlotOptions::new("System latency")
                    .with_axis_labels("Latency (microseconds)", "CDF")
                    .with_x_scale(XScale::Log)
                    .with_x_limits(0.1, 10000.0)
                    .with_y_limits(0.0, 1.2)
                    .with_legend(LegendPlacement::LowerRight);
                charts.push((
                    "client_latency.png",
                    self.cdf_chart(
                        options,
                        ArtifactRole::SysLatency,
                        config.cycles_per_microsecond,
                        "client_latency.png",
                    )?,
                ));
            }
            Capture::ClientLatency => {
                let options = PlotOptions::new("Client latency")
                    .with_axis_labels("Latency (microseconds)", "CDF")
                    .with_x_scale(XScale::Log)
                    .with_x_limits(0.1, 10000.0)
                    .with_y_limits(0.0, 1.2)
                    .with_legend(LegendPlacement::MiddleRight);
                charts.push((
                    "client_latency_cdf.png",
                    self.cdf_chart(
                        options,
                        ArtifactRole::ClientLatency,
                        config.client_latency_divisor,
                        "client_latency_cdf.png",
                    )?,
                ));
            }
        }

        let mut report = ReportCharts::default();
        for (name, (builder, failures)) in charts {
            report.failures.extend(failures);
            if builder.is_empty() {
                warn!(chart = name, "No valid series, chart skipped");
                report.skipped.push(name.to_string());
                continue;
            }
            match builder.render(&out_dir.join(name)) {
                Ok(path) => {
                    info!(chart = %path.display(), series = builder.len(), "Rendered chart");
                    report.rendered.push(path);
                }
                Err(error) => {
                    warn!(chart = name, error = %error, "Chart failed to render");
                    report.errors.push(ChartError {
                        chart: name.to_string(),
                        error,
                    });
                }
            }
        }
        Ok(report)
    }

    /// Lazy points against the eager baseline, drawn flat across the lazy
    /// axis values
    fn throughput_chart(&self, summaries: &[ThroughputSummary]) -> ComparativePlotBuilder {
        let (lazy, eager): (Vec<&ThroughputSummary>, Vec<&ThroughputSummary>) =
            summaries.iter().partition(|s| s.mode == Mode::Lazy);

        let config = self.plan.config();
        let mut options = match self.plan.kind() {
            CampaignKind::CacheLocality => PlotOptions::new("Throughput vs. substitution threshold")
                .with_axis_labels("Substitution threshold", "Throughput (txns/s)")
                .with_legend(LegendPlacement::UpperRight),
            CampaignKind::BlindWrite => PlotOptions::new("Throughput vs. blind-write frequency")
                .with_axis_labels("Blind-write frequency", "Throughput (txns/s)")
                .with_x_scale(XScale::Log)
                .with_legend(LegendPlacement::MiddleRight),
        };
        (options.x_limits, options.y_limits) = match self.plan.kind() {
            CampaignKind::CacheLocality => (
                config.cache_throughput_x_limits,
                config.cache_throughput_y_limits,
            ),
            CampaignKind::BlindWrite => (
                config.blind_throughput_x_limits,
                config.blind_throughput_y_limits,
            ),
        };
        let mut builder = ComparativePlotBuilder::new(options);

        match self.plan.kind() {
            CampaignKind::CacheLocality => {
                if !lazy.is_empty() {
                    builder.add_stats(
                        "lazy",
                        lazy.iter().map(|s| (s.axis_value, s.stat)).collect(),
                    );
                }
            }
            CampaignKind::BlindWrite => {
                for &threshold in &self.plan.config().blind_thresholds {
                    let points: Vec<_> = lazy
                        .iter()
                        .filter(|s| s.threshold == threshold)
                        .map(|s| (s.axis_value, s.stat))
                        .collect();
                    if !points.is_empty() {
                        builder.add_stats(format!("lazy (threshold {})", threshold), points);
                    }
                }
            }
        }

        let mut xs: Vec<f64> = lazy.iter().map(|s| s.axis_value).collect();
        xs.sort_by(|a, b| a.total_cmp(b));
        xs.dedup();
        if !xs.is_empty() {
            for baseline in eager {
                builder.add_stats(
                    baseline.label.clone(),
                    xs.iter().map(|&x| (x, baseline.stat)).collect(),
                );
            }
        }

        builder
    }

    /// One CDF curve per point, from its final repetition
    fn cdf_chart(
        &self,
        options: PlotOptions,
        role: ArtifactRole,
        divisor: f64,
        chart: &str,
    ) -> crate::error::Result<(ComparativePlotBuilder, Vec<SeriesFailure>)> {
        let mut builder = ComparativePlotBuilder::new(options);
        let mut failures = Vec::new();

        for group in self.plan.grid().iter() {
            match self.final_cdf(group, role, divisor) {
                Ok(cdf) => builder.add_cdf(group.point.label(), cdf),
                Err(error) if !error.is_series_local() => return Err(error),
                Err(error) => {
                    warn!(chart, point = %group.point, error = %error, "Skipping series");
                    failures.push(SeriesFailure {
                        chart: chart.to_string(),
                        series: group.point.label(),
                        error,
                    });
                }
            }
        }
        Ok((builder, failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::CampaignPlan;
    use crate::config::CampaignConfig;
    use crate::error::HarnessError;
    use crate::metrics::AggregateStat;
    use tempfile::TempDir;

    fn summary(
        label: &str,
        mode: Mode,
        threshold: u32,
        freq: Option<u32>,
        axis: f64,
    ) -> ThroughputSummary {
        let stat = AggregateStat {
            avg: axis * 10.0,
            min: axis * 9.0,
            max: axis * 11.0,
            samples: 1,
        };
        ThroughputSummary {
            label: label.to_string(),
            mode,
            threshold,
            blind_frequency: freq,
            axis_value: axis,
            stat,
            per_repetition: vec![stat],
            archives: Vec::new(),
        }
    }

    #[test]
    fn test_cache_throughput_chart_draws_flat_baseline() {
        let plan = CampaignPlan::new(
            CampaignKind::CacheLocality,
            Capture::Throughput,
            CampaignConfig::default(),
        )
        .unwrap();
        let report = CampaignReport::new(&plan, "final");
        let summaries = vec![
            summary("lazy_50", Mode::Lazy, 50, None, 50.0),
            summary("lazy_100", Mode::Lazy, 100, None, 100.0),
            summary("eager", Mode::Eager, 300, None, 300.0),
        ];

        let builder = report.throughput_chart(&summaries);
        assert_eq!(builder.labels().collect::<Vec<_>>(), vec!["lazy", "eager"]);

        // The baseline spans the lazy axis, not its own sentinel threshold
        let (x, _) = builder.resolved_limits().unwrap();
        assert!(x.end < 300.0);
    }

    #[test]
    fn test_blind_throughput_chart_series_per_threshold() {
        let config = CampaignConfig {
            blind_thresholds: vec![100, 250],
            ..Default::default()
        };
        let plan =
            CampaignPlan::new(CampaignKind::BlindWrite, Capture::Throughput, config).unwrap();
        let report = CampaignReport::new(&plan, "blind");
        let summaries = vec![
            summary("lazy_100_blind_2", Mode::Lazy, 100, Some(2), 2.0),
            summary("lazy_250_blind_2", Mode::Lazy, 250, Some(2), 2.0),
            summary("lazy_250_blind_4", Mode::Lazy, 250, Some(4), 4.0),
        ];

        let builder = report.throughput_chart(&summaries);
        assert_eq!(
            builder.labels().collect::<Vec<_>>(),
            vec!["lazy (threshold 100)", "lazy (threshold 250)"]
        );
        assert_eq!(builder.options().x_scale, XScale::Log);
    }

    #[test]
    fn test_cdf_chart_isolates_bad_series() {
        let dir = TempDir::new().unwrap();
        let config = CampaignConfig {
            thresholds: vec![50, 100],
            ..Default::default()
        }
        .with_repetitions(1);
        let plan =
            CampaignPlan::new(CampaignKind::CacheLocality, Capture::Throughput, config).unwrap();
        fs::write(dir.path().join("lazy_50_txn_latency.txt"), "0.5 100\n1 400\n").unwrap();
        fs::write(dir.path().join("lazy_100_txn_latency.txt"), "0.5 100\nbad\n").unwrap();
        fs::write(dir.path().join("eager_txn_latency.txt"), "1 250\n").unwrap();

        let report = CampaignReport::new(&plan, dir.path());
        let options = PlotOptions::new("Transaction execution time");
        let (builder, failures) =
            report
                .cdf_chart(options, ArtifactRole::TxnLatency, 1.0, "txn_latency.png")
                .unwrap();

        assert_eq!(builder.labels().collect::<Vec<_>>(), vec!["lazy_50", "eager"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].series, "lazy_100");
        assert_eq!(failures[0].chart, "txn_latency.png");
        assert!(matches!(failures[0].error, HarnessError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_chart_with_no_valid_series_is_skipped() {
        let dir = TempDir::new().unwrap();
        let plan = CampaignPlan::new(
            CampaignKind::BlindWrite,
            Capture::ClientLatency,
            CampaignConfig::default(),
        )
        .unwrap();

        let report = CampaignReport::new(&plan, dir.path());
        let charts = report.render_charts(&[], &dir.path().join("plots")).unwrap();

        assert!(charts.rendered.is_empty());
        assert_eq!(charts.skipped, vec!["client_latency_cdf.png"]);
        assert_eq!(charts.failures.len(), 5);
        assert!(charts
            .failures
            .iter()
            .all(|f| matches!(f.error, HarnessError::MissingArtifact { .. })));
    }

    fn write_cache_archive(dir: &Path, thresholds: &[u32]) {
        let labels = thresholds
            .iter()
            .map(|t| (format!("lazy_{}", t), format!("lazy_1000_subst_threshold_{}", t)))
            .chain([("eager".to_string(), "eager".to_string())]);
        for (label, throughput) in labels {
            fs::write(
                dir.join(format!("{}_normal_30.txt", throughput)),
                "1.0 500000\n2.0 1100000\n",
            )
            .unwrap();
            fs::write(
                dir.join(format!("{}_txn_latency.txt", label)),
                "0.5 150\n1 2000\n",
            )
            .unwrap();
            fs::write(
                dir.join(format!("{}_sys_latency.txt", label)),
                "0.5 1996\n1 19960\n",
            )
            .unwrap();
        }
    }

    fn cache_plan() -> CampaignPlan {
        let config = CampaignConfig {
            thresholds: vec![50, 100],
            ..Default::default()
        }
        .with_repetitions(1);
        CampaignPlan::new(CampaignKind::CacheLocality, Capture::Throughput, config).unwrap()
    }

    #[test]
    fn test_render_cache_charts() {
        let dir = TempDir::new().unwrap();
        write_cache_archive(dir.path(), &[50, 100]);
        let plan = cache_plan();

        let report = CampaignReport::new(&plan, dir.path());
        let (summaries, failures) = report.throughput_summaries().unwrap();
        assert!(failures.is_empty());

        let out = dir.path().join("plots");
        let charts = report.render_charts(&summaries, &out).unwrap();

        let names: Vec<_> = charts
            .rendered
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["cache_throughput.png", "txn_latency.png", "client_latency.png"]
        );
        assert!(charts.rendered.iter().all(|p| p.exists()));
        assert!(charts.skipped.is_empty());
        assert!(charts.failures.is_empty());
        assert!(charts.errors.is_empty());
    }

    #[test]
    fn test_render_error_does_not_stop_other_charts() {
        let dir = TempDir::new().unwrap();
        write_cache_archive(dir.path(), &[50, 100]);
        let plan = cache_plan();
        let out = dir.path().join("plots");
        fs::create_dir_all(out.join("cache_throughput.png")).unwrap();

        let report = CampaignReport::new(&plan, dir.path());
        let (summaries, _) = report.throughput_summaries().unwrap();
        let charts = report.render_charts(&summaries, &out).unwrap();

        assert_eq!(charts.errors.len(), 1);
        assert_eq!(charts.errors[0].chart, "cache_throughput.png");
        assert_eq!(charts.rendered.len(), 2);
        assert!(out.join("client_latency.png").exists());
    }

    #[test]
    fn test_throughput_chart_uses_configured_limits() {
        let plan = cache_plan();
        let report = CampaignReport::new(&plan, "final");
        let summaries = vec![summary("lazy_50", Mode::Lazy, 50, None, 50.0)];

        let (x, y) = report.throughput_chart(&summaries).resolved_limits().unwrap();
        assert_eq!(x, 50.0..250.0);
        assert_eq!(y, 250_000.0..650_000.0);

        let config = CampaignConfig {
            blind_throughput_x_limits: None,
            blind_throughput_y_limits: Some((0.0, 10.0)),
            ..Default::default()
        };
        let plan =
            CampaignPlan::new(CampaignKind::BlindWrite, Capture::Throughput, config).unwrap();
        let report = CampaignReport::new(&plan, "blind");
        let summaries = vec![
            summary("lazy_250_blind_2", Mode::Lazy, 250, Some(2), 2.0),
            summary("lazy_250_blind_8", Mode::Lazy, 250, Some(8), 8.0),
        ];
        let (x, y) = report.throughput_chart(&summaries).resolved_limits().unwrap();
        // Derived from the data on a log axis
        assert_eq!(x, 1.6..10.0);
        assert_eq!(y, 0.0..10.0);
    }
}
