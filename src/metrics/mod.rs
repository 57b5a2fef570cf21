//! Metrics aggregation over harvested artifacts

mod reader;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::check_divisor;
use crate::error::{HarnessError, Result};

/// One line of a throughput file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    /// Wall-clock seconds of the run
    pub elapsed_secs: f64,
    /// Transactions completed in that time
    pub ops_done: u64,
}

impl ThroughputSample {
    /// Transactions per second
    pub fn throughput(&self) -> f64 {
        self.ops_done as f64 / self.elapsed_secs
    }
}

/// One point of an empirical CDF as emitted by the workload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    pub fraction: f64,
    pub raw_value: f64,
}

/// Mean, min and max of a pooled set of values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateStat {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl AggregateStat {
    /// Aggregate `values`; `None` when there are none
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
        );
        // Rounding can push the mean a hair outside [min, max]
        let avg = (sum / values.len() as f64).clamp(min, max);
        Some(Self {
            avg,
            min,
            max,
            samples: values.len(),
        })
    }
}

/// Scaled CDF curve: `(raw_value / divisor, fraction)` in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CdfSeries {
    points: Vec<(f64, f64)>,
}

impl CdfSeries {
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Read every sample of a throughput file
///
/// Fails on a zero elapsed time rather than producing an infinite rate.
pub fn read_throughput_samples(path: &Path) -> Result<Vec<ThroughputSample>> {
    let content = reader::read_artifact(path)?;
    reader::rows(path, &content)?
        .into_iter()
        .map(|row| {
            let elapsed_secs = reader::non_negative(path, row.line, row.first)?;
            let ops_done: u64 = row.second.parse().map_err(|_| {
                HarnessError::parse(
                    path,
                    row.line,
                    format!("invalid operation count '{}'", row.second),
                )
            })?;
            if elapsed_secs == 0.0 {
                return Err(HarnessError::DivideByZero {
                    path: path.to_path_buf(),
                    line: row.line,
                });
            }
            Ok(ThroughputSample {
                elapsed_secs,
                ops_done,
            })
        })
        .collect()
}

/// Read a CDF file, checking fractions, sign and ascending order
pub fn read_latency_samples(path: &Path) -> Result<Vec<LatencySample>> {
    let content = reader::read_artifact(path)?;
    let mut samples: Vec<LatencySample> = Vec::new();

    for row in reader::rows(path, &content)? {
        let fraction = reader::finite(path, row.line, row.first)?;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(HarnessError::parse(
                path,
                row.line,
                format!("fraction {} outside [0, 1]", fraction),
            ));
        }
        let raw_value = reader::non_negative(path, row.line, row.second)?;
        if let Some(prev) = samples.last() {
            if raw_value < prev.raw_value {
                return Err(HarnessError::parse(
                    path,
                    row.line,
                    format!(
                        "value {} is below the previous value {}",
                        raw_value, prev.raw_value
                    ),
                ));
            }
        }
        samples.push(LatencySample {
            fraction,
            raw_value,
        });
    }

    Ok(samples)
}

/// Aggregate the per-line throughput of one file
///
/// In pooled mode the file holds one line per repetition, so the result
/// pools every repetition of the point.
pub fn compute_throughput_stats(path: &Path) -> Result<AggregateStat> {
    let values: Vec<f64> = read_throughput_samples(path)?
        .iter()
        .map(ThroughputSample::throughput)
        .collect();
    AggregateStat::from_values(&values)
        .ok_or_else(|| HarnessError::parse(path, 1, "file contains no samples"))
}

/// Pool the samples of several throughput files into one aggregate
///
/// Returns `None` for an empty file list.
pub fn pool_throughput_stats<P: AsRef<Path>>(paths: &[P]) -> Result<Option<AggregateStat>> {
    let mut values = Vec::new();
    for path in paths {
        values.extend(
            read_throughput_samples(path.as_ref())?
                .iter()
                .map(ThroughputSample::throughput),
        );
    }
    Ok(AggregateStat::from_values(&values))
}

/// One aggregate per throughput file, in the given order
pub fn per_repetition_stats<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<AggregateStat>> {
    paths
        .iter()
        .map(|path| compute_throughput_stats(path.as_ref()))
        .collect()
}

/// Scale a CDF file by `divisor`, keeping the input order
pub fn build_cdf(path: &Path, divisor: f64) -> Result<CdfSeries> {
    check_divisor(divisor)?;
    let points = read_latency_samples(path)?
        .into_iter()
        .map(|s| (s.raw_value / divisor, s.fraction))
        .collect();
    Ok(CdfSeries { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_throughput_stats() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "eager_normal_30.txt",
            "1.0 500000\n1.0 520000\n1.0 480000\n",
        );

        let stat = compute_throughput_stats(&path).unwrap();
        assert_eq!(stat.avg, 500000.0);
        assert_eq!(stat.min, 480000.0);
        assert_eq!(stat.max, 520000.0);
        assert_eq!(stat.samples, 3);
    }

    #[test]
    fn test_throughput_uses_elapsed_time() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.txt", "2.000000500 1000000\n0.5 1000000\n");

        let stat = compute_throughput_stats(&path).unwrap();
        assert!((stat.min - 499999.875).abs() < 1e-3);
        assert_eq!(stat.max, 2000000.0);
    }

    #[test]
    fn test_zero_elapsed_is_divide_by_zero() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.txt", "1.0 10\n0.0 100\n");

        let err = compute_throughput_stats(&path).unwrap_err();
        assert!(matches!(err, HarnessError::DivideByZero { line: 2, .. }));
    }

    #[test]
    fn test_throughput_parse_errors() {
        let dir = TempDir::new().unwrap();

        let path = write(&dir, "a.txt", "1.0 abc\n");
        let err = compute_throughput_stats(&path).unwrap_err();
        assert!(err.to_string().ends_with("a.txt:1: invalid operation count 'abc'"));

        let path = write(&dir, "b.txt", "-1.0 100\n");
        assert!(matches!(
            compute_throughput_stats(&path),
            Err(HarnessError::Parse { line: 1, .. })
        ));

        let path = write(&dir, "c.txt", "");
        assert!(matches!(
            compute_throughput_stats(&path),
            Err(HarnessError::Parse { .. })
        ));
    }

    #[test]
    fn test_pool_and_per_repetition() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a_rep0.txt", "1.0 100\n");
        let b = write(&dir, "a_rep1.txt", "1.0 300\n");

        let pooled = pool_throughput_stats(&[&a, &b]).unwrap().unwrap();
        assert_eq!(pooled.avg, 200.0);
        assert_eq!(pooled.samples, 2);

        let each = per_repetition_stats(&[&a, &b]).unwrap();
        assert_eq!(each.len(), 2);
        assert_eq!(each[1].avg, 300.0);

        let none: [&Path; 0] = [];
        assert!(pool_throughput_stats(&none).unwrap().is_none());
    }

    #[test]
    fn test_build_cdf() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "sys.txt", "0.0 100\n0.5 500\n1.0 2000\n");

        let cdf = build_cdf(&path, 1996.0).unwrap();
        let expected = [(0.0501, 0.0), (0.2505, 0.5), (1.0020, 1.0)];
        assert_eq!(cdf.len(), 3);
        for ((x, y), (ex, ey)) in cdf.points().iter().zip(expected) {
            assert!((x - ex).abs() < 1e-4, "{} vs {}", x, ex);
            assert_eq!(*y, ey);
        }
    }

    #[test]
    fn test_build_cdf_accepts_fractional_values() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "client.txt", "0.25 0.75\n1 12.5\n");

        let cdf = build_cdf(&path, 1.0).unwrap();
        assert_eq!(cdf.points(), &[(0.75, 0.25), (12.5, 1.0)]);
    }

    #[test]
    fn test_build_cdf_rejects_bad_input() {
        let dir = TempDir::new().unwrap();

        let path = write(&dir, "order.txt", "0.1 500\n0.2 400\n");
        let err = build_cdf(&path, 1.0).unwrap_err();
        assert!(matches!(err, HarnessError::Parse { line: 2, .. }));

        let path = write(&dir, "fraction.txt", "1.5 500\n");
        assert!(build_cdf(&path, 1.0).is_err());

        let path = write(&dir, "negative.txt", "0.5 -1\n");
        assert!(build_cdf(&path, 1.0).is_err());

        let path = write(&dir, "ok.txt", "0.5 1\n");
        assert!(matches!(
            build_cdf(&path, 0.0),
            Err(HarnessError::Config(_))
        ));
    }

    #[test]
    fn test_torn_write_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::write(&path, b"1.0 500\n\xff\xfe 12\n").unwrap();

        let err = compute_throughput_stats(&path).unwrap_err();
        assert!(matches!(err, HarnessError::Parse { line: 2, .. }));
        assert!(err.is_series_local());

        let err = build_cdf(&path, 1.0).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_missing_file_is_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let err = build_cdf(&dir.path().join("absent.txt"), 1.0).unwrap_err();
        assert!(matches!(err, HarnessError::MissingArtifact { .. }));
        assert!(err.is_series_local());
    }

    proptest! {
        #[test]
        fn prop_avg_within_min_max(
            samples in prop::collection::vec((0.001f64..1000.0, 0u64..10_000_000_000), 1..50)
        ) {
            let dir = TempDir::new().unwrap();
            let content: String = samples
                .iter()
                .map(|(elapsed, ops)| format!("{} {}\n", elapsed, ops))
                .collect();
            let path = write(&dir, "t.txt", &content);

            let stat = compute_throughput_stats(&path).unwrap();
            prop_assert!(stat.min <= stat.avg && stat.avg <= stat.max);
            prop_assert_eq!(stat.samples, samples.len());
        }

        #[test]
        fn prop_cdf_preserves_order(
            mut values in prop::collection::vec(0.0f64..1e9, 1..50),
            divisor in 0.001f64..1e4,
        ) {
            values.sort_by(|a, b| a.total_cmp(b));
            let n = values.len();
            let content: String = values
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{} {}\n", (i + 1) as f64 / n as f64, v))
                .collect();
            let dir = TempDir::new().unwrap();
            let path = write(&dir, "cdf.txt", &content);

            let cdf = build_cdf(&path, divisor).unwrap();
            prop_assert_eq!(cdf.len(), n);
            prop_assert!(cdf.points().windows(2).all(|w| w[0].0 <= w[1].0));
        }
    }
}
