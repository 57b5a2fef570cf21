//! Comparative charts: one curve per configuration on a shared axis

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use plotters::coord::ranged1d::ValueFormatter;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::options::{resolve_range, PlotOptions, XScale};
use crate::config::ConfigError;
use crate::metrics::{AggregateStat, CdfSeries};

/// Data behind one curve
#[derive(Debug, Clone)]
pub enum SeriesData {
    /// Aggregates indexed by a configuration axis value
    Stats(Vec<(f64, AggregateStat)>),
    /// Scaled CDF curve
    Cdf(CdfSeries),
}

#[derive(Debug, Clone)]
struct LabeledSeries {
    label: String,
    data: SeriesData,
}

/// Builds a chart comparing labeled series
///
/// Stats series are drawn as an average line with markers and min/max
/// error bars; CDF series as plain lines. No statistics are computed here.
#[derive(Debug, Clone)]
pub struct ComparativePlotBuilder {
    options: PlotOptions,
    series: Vec<LabeledSeries>,
}

impl ComparativePlotBuilder {
    pub fn new(options: PlotOptions) -> Self {
        Self {
            options,
            series: Vec::new(),
        }
    }

    pub fn options(&self) -> &PlotOptions {
        &self.options
    }

    /// Add a series of aggregates indexed by `x`
    pub fn add_stats(&mut self, label: impl Into<String>, points: Vec<(f64, AggregateStat)>) {
        self.add(label, SeriesData::Stats(points));
    }

    /// Add a CDF curve
    pub fn add_cdf(&mut self, label: impl Into<String>, cdf: CdfSeries) {
        self.add(label, SeriesData::Cdf(cdf));
    }

    pub fn add(&mut self, label: impl Into<String>, data: SeriesData) {
        self.series.push(LabeledSeries {
            label: label.into(),
            data,
        });
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.label.as_str())
    }

    fn log_x(&self) -> bool {
        self.options.x_scale == XScale::Log
    }

    /// Points of `data` that can be placed on the x axis
    fn drawable(&self, data: &SeriesData) -> Vec<(f64, f64, f64, f64)> {
        let log = self.log_x();
        let keep = |x: f64| x.is_finite() && (!log || x > 0.0);
        match data {
            SeriesData::Stats(points) => points
                .iter()
                .filter(|(x, _)| keep(*x))
                .map(|(x, s)| (*x, s.min, s.avg, s.max))
                .collect(),
            SeriesData::Cdf(cdf) => cdf
                .points()
                .iter()
                .filter(|(x, _)| keep(*x))
                .map(|&(x, y)| (x, y, y, y))
                .collect(),
        }
    }

    /// Axis ranges the chart will use
    pub fn resolved_limits(&self) -> Result<(Range<f64>, Range<f64>), ConfigError> {
        let points: Vec<(f64, f64, f64, f64)> = self
            .series
            .iter()
            .flat_map(|s| self.drawable(&s.data))
            .collect();

        let x = resolve_range(
            "x",
            self.options.x_limits,
            points.iter().map(|p| p.0),
            self.log_x(),
        )?;
        let y = resolve_range(
            "y",
            self.options.y_limits,
            points.iter().flat_map(|p| [p.1, p.3]),
            false,
        )?;
        Ok((x, y))
    }

    /// Render the chart as a PNG at `path` and return the path
    pub fn render(&self, path: &Path) -> Result<PathBuf> {
        if self.is_empty() {
            bail!("no series to plot for '{}'", self.options.title);
        }
        let (x_range, y_range) = self
            .resolved_limits()
            .with_context(|| format!("cannot lay out '{}'", self.options.title))?;

        let root = BitMapBackend::new(path, self.options.size).into_drawing_area();
        root.fill(&WHITE)?;

        match self.options.x_scale {
            XScale::Linear => {
                self.draw(&root, RangedCoordf64::from(x_range), y_range)?;
            }
            XScale::Log => {
                let x: LogCoord<f64> = x_range.log_scale().into();
                self.draw(&root, x, y_range)?;
            }
        }

        root.present()
            .with_context(|| format!("failed to write chart {}", path.display()))?;
        Ok(path.to_path_buf())
    }

    fn draw<X>(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        x_coord: X,
        y_range: Range<f64>,
    ) -> Result<()>
    where
        X: Ranged<ValueType = f64> + ValueFormatter<f64>,
    {
        let mut chart = ChartBuilder::on(root)
            .caption(&self.options.title, ("sans-serif", 40))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d(x_coord, y_range)?;

        chart
            .configure_mesh()
            .x_desc(self.options.x_label.as_str())
            .y_desc(self.options.y_label.as_str())
            .draw()?;

        for (idx, series) in self.series.iter().enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            let style = color.stroke_width(2);
            let points = self.drawable(&series.data);

            match &series.data {
                SeriesData::Stats(_) => {
                    chart
                        .draw_series(LineSeries::new(
                            points.iter().map(|&(x, _, avg, _)| (x, avg)),
                            style,
                        ))?
                        .label(series.label.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));

                    chart.draw_series(
                        points
                            .iter()
                            .map(|&(x, _, avg, _)| Circle::new((x, avg), 4, color.filled())),
                    )?;
                    chart.draw_series(points.iter().map(|&(x, min, avg, max)| {
                        ErrorBar::new_vertical(x, min, avg, max, style, 10)
                    }))?;
                }
                SeriesData::Cdf(_) => {
                    chart
                        .draw_series(LineSeries::new(
                            points.iter().map(|&(x, y, _, _)| (x, y)),
                            style,
                        ))?
                        .label(series.label.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
                }
            }
        }

        chart
            .configure_series_labels()
            .position(self.options.legend.position())
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        Ok(())
    }
}
