//! Chart options and axis limits

use std::ops::Range;

use plotters::chart::SeriesLabelPosition;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Horizontal axis scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XScale {
    #[default]
    Linear,
    Log,
}

/// Where the legend box sits inside the plotting area
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendPlacement {
    UpperLeft,
    UpperRight,
    LowerLeft,
    #[default]
    LowerRight,
    MiddleRight,
}

impl LegendPlacement {
    pub(crate) fn position(&self) -> SeriesLabelPosition {
        match self {
            LegendPlacement::UpperLeft => SeriesLabelPosition::UpperLeft,
            LegendPlacement::UpperRight => SeriesLabelPosition::UpperRight,
            LegendPlacement::LowerLeft => SeriesLabelPosition::LowerLeft,
            LegendPlacement::LowerRight => SeriesLabelPosition::LowerRight,
            LegendPlacement::MiddleRight => SeriesLabelPosition::MiddleRight,
        }
    }
}

/// Presentation options of one comparative chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotOptions {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_scale: XScale,
    /// Fixed x range; derived from the data when absent
    pub x_limits: Option<(f64, f64)>,
    /// Fixed y range; derived from the data when absent
    pub y_limits: Option<(f64, f64)>,
    pub legend: LegendPlacement,
    /// Image size in pixels
    pub size: (u32, u32),
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            x_scale: XScale::Linear,
            x_limits: None,
            y_limits: None,
            legend: LegendPlacement::LowerRight,
            size: (1200, 800),
        }
    }
}

impl PlotOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_axis_labels(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_label = x.into();
        self.y_label = y.into();
        self
    }

    pub fn with_x_scale(mut self, scale: XScale) -> Self {
        self.x_scale = scale;
        self
    }

    pub fn with_x_limits(mut self, lo: f64, hi: f64) -> Self {
        self.x_limits = Some((lo, hi));
        self
    }

    pub fn with_y_limits(mut self, lo: f64, hi: f64) -> Self {
        self.y_limits = Some((lo, hi));
        self
    }

    pub fn with_legend(mut self, legend: LegendPlacement) -> Self {
        self.legend = legend;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }
}

/// Check a fixed range, or derive one from `values` with padding
pub(crate) fn resolve_range(
    axis: &str,
    fixed: Option<(f64, f64)>,
    values: impl Iterator<Item = f64>,
    log: bool,
) -> Result<Range<f64>, ConfigError> {
    let (lo, hi) = match fixed {
        Some(limits) => limits,
        None => {
            let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
            if lo > hi {
                return Err(ConfigError::InvalidLimits(format!(
                    "no data to derive {} limits from",
                    axis
                )));
            }
            pad(lo, hi, log)
        }
    };

    if !lo.is_finite() || !hi.is_finite() || lo >= hi {
        return Err(ConfigError::InvalidLimits(format!(
            "{} range [{}, {}] is empty or not finite",
            axis, lo, hi
        )));
    }
    if log && lo <= 0.0 {
        return Err(ConfigError::InvalidLimits(format!(
            "{} log range must be positive, got [{}, {}]",
            axis, lo, hi
        )));
    }
    Ok(lo..hi)
}

fn pad(lo: f64, hi: f64, log: bool) -> (f64, f64) {
    if log {
        return (lo / 1.25, hi * 1.25);
    }
    let span = hi - lo;
    let padding = if span > 0.0 {
        span * 0.05
    } else {
        (lo.abs() * 0.1).max(1.0)
    };
    (lo - padding, hi + padding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_limits_pass_through() {
        let range = resolve_range("x", Some((100.0, 10000.0)), std::iter::empty(), true).unwrap();
        assert_eq!(range, 100.0..10000.0);
    }

    #[test]
    fn test_derived_linear_limits_are_padded() {
        let range = resolve_range("y", None, [10.0, 20.0, 30.0].into_iter(), false).unwrap();
        assert_eq!(range, 9.0..31.0);

        let flat = resolve_range("y", None, [5.0].into_iter(), false).unwrap();
        assert_eq!(flat, 4.0..6.0);
    }

    #[test]
    fn test_derived_log_limits() {
        let range = resolve_range("x", None, [2.0, 32.0].into_iter(), true).unwrap();
        assert!((range.start - 1.6).abs() < 1e-12);
        assert!((range.end - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_limits() {
        assert!(resolve_range("x", Some((0.0, 100.0)), std::iter::empty(), true).is_err());
        assert!(resolve_range("x", Some((5.0, 5.0)), std::iter::empty(), false).is_err());
        assert!(resolve_range("x", Some((0.0, f64::INFINITY)), std::iter::empty(), false).is_err());

        let err = resolve_range("x", None, std::iter::empty(), false).unwrap_err();
        assert!(err.to_string().contains("no data"));
    }

    #[test]
    fn test_options_builder() {
        let options = PlotOptions::new("Throughput")
            .with_axis_labels("Threshold", "Txns/s")
            .with_x_scale(XScale::Log)
            .with_y_limits(0.0, 1.2)
            .with_legend(LegendPlacement::MiddleRight)
            .with_size(800, 600);

        assert_eq!(options.title, "Throughput");
        assert_eq!(options.x_scale, XScale::Log);
        assert_eq!(options.y_limits, Some((0.0, 1.2)));
        assert_eq!(options.x_limits, None);
        assert_eq!(options.size, (800, 600));
    }
}
