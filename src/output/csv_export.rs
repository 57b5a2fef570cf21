//! CSV export functionality

use crate::report::ThroughputSummary;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub struct CsvExporter;

impl CsvExporter {
    /// Export one row per experiment point
    pub fn export(summaries: &[ThroughputSummary], path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record([
            "label",
            "mode",
            "threshold",
            "blind_frequency",
            "axis_value",
            "avg",
            "min",
            "max",
            "samples",
            "repetitions",
        ])?;

        for summary in summaries {
            wtr.write_record(&[
                summary.label.clone(),
                summary.mode.to_string(),
                summary.threshold.to_string(),
                summary
                    .blind_frequency
                    .map(|f| f.to_string())
                    .unwrap_or_default(),
                summary.axis_value.to_string(),
                format!("{:.2}", summary.stat.avg),
                format!("{:.2}", summary.stat.min),
                format!("{:.2}", summary.stat.max),
                summary.stat.samples.to_string(),
                summary.repetitions().to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}
