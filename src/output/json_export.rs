//! JSON export functionality

use crate::campaign::CampaignPlan;
use crate::report::ThroughputSummary;
use anyhow::{Context, Result};
use serde_json::json;
use std::fs::File;
use std::path::Path;

pub struct JsonExporter;

impl JsonExporter {
    /// Export throughput summaries to a JSON file
    pub fn export(plan: &CampaignPlan, summaries: &[ThroughputSummary], path: &Path) -> Result<()> {
        let output = json!({
            "campaign": plan.kind(),
            "capture": plan.capture(),
            "repetition_mode": plan.repetition_mode(),
            "points": summaries,
        });

        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &output)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{CampaignKind, Capture};
    use crate::config::CampaignConfig;
    use crate::grid::Mode;
    use crate::metrics::AggregateStat;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_export_summaries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        let plan = CampaignPlan::new(
            CampaignKind::CacheLocality,
            Capture::Throughput,
            CampaignConfig::default(),
        )
        .unwrap();
        let stat = AggregateStat {
            avg: 500000.0,
            min: 480000.0,
            max: 520000.0,
            samples: 3,
        };
        let summaries = vec![ThroughputSummary {
            label: "eager".to_string(),
            mode: Mode::Eager,
            threshold: 300,
            blind_frequency: None,
            axis_value: 300.0,
            stat,
            per_repetition: vec![stat],
            archives: vec![PathBuf::from("final/eager_normal_30.txt")],
        }];

        JsonExporter::export(&plan, &summaries, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["campaign"], "cache_locality");
        assert_eq!(value["repetition_mode"], "pooled");
        assert_eq!(value["points"][0]["label"], "eager");
        assert_eq!(value["points"][0]["mode"], "eager");
        assert_eq!(value["points"][0]["stat"]["min"], 480000.0);
        assert!(value["points"][0].get("blind_frequency").is_none());
    }
}
