//! Campaign manifest
//!
//! Records what was run, with which arguments, and where every artifact was
//! archived, so a partial campaign can be inspected or resumed by hand.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::campaign::{CampaignKind, CampaignPlan, Capture};
use crate::config::RepetitionMode;
use crate::runner::CampaignOutcome;

#[derive(Debug, Serialize)]
pub struct PointManifest {
    pub label: String,
    pub arguments: Vec<String>,
    pub repetitions: usize,
    pub completed: usize,
    pub archived: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CampaignManifest {
    pub campaign: CampaignKind,
    pub capture: Capture,
    pub repetition_mode: RepetitionMode,
    pub archive_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub points: Vec<PointManifest>,
}

impl CampaignManifest {
    pub fn from_outcome(
        plan: &CampaignPlan,
        archive_dir: &Path,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        outcome: &CampaignOutcome,
    ) -> Self {
        let points = outcome
            .records
            .iter()
            .map(|record| PointManifest {
                label: record.point.label(),
                arguments: record.arguments.clone(),
                repetitions: record.repetitions,
                completed: record.completed,
                archived: record.archived.clone(),
                error: record.failure.as_ref().map(|e| e.to_string()),
            })
            .collect();

        Self {
            campaign: plan.kind(),
            capture: plan.capture(),
            repetition_mode: plan.repetition_mode(),
            archive_dir: archive_dir.to_path_buf(),
            started_at,
            finished_at,
            points,
        }
    }

    /// Write the manifest as pretty JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CampaignConfig;
    use crate::error::HarnessError;
    use crate::grid::ExperimentPoint;
    use crate::runner::PointRecord;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_records_failures() {
        let dir = TempDir::new().unwrap();
        let plan = CampaignPlan::new(
            CampaignKind::BlindWrite,
            Capture::ClientLatency,
            CampaignConfig::default(),
        )
        .unwrap();
        let outcome = CampaignOutcome {
            records: vec![
                PointRecord {
                    point: ExperimentPoint::lazy(300, 1000).with_blind_frequency(2),
                    arguments: vec!["--period".into(), "1000".into()],
                    repetitions: 1,
                    completed: 1,
                    archived: vec![PathBuf::from("client/threshold_300_freq_2.txt")],
                    failure: None,
                },
                PointRecord {
                    point: ExperimentPoint::lazy(300, 1000).with_blind_frequency(4),
                    arguments: Vec::new(),
                    repetitions: 1,
                    completed: 0,
                    archived: Vec::new(),
                    failure: Some(HarnessError::ProcessFailure {
                        point: "lazy_300_blind_4".into(),
                        repetition: 0,
                        reason: "exit status: 1".into(),
                    }),
                },
            ],
        };

        let now = Utc::now();
        let manifest =
            CampaignManifest::from_outcome(&plan, Path::new("client"), now, now, &outcome);
        let path = dir.path().join("manifest.json");
        manifest.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["campaign"], "blind_write");
        assert_eq!(value["capture"], "client_latency");
        assert_eq!(value["points"][0]["label"], "lazy_300_blind_2");
        assert!(value["points"][0].get("error").is_none());
        assert!(value["points"][1]["error"]
            .as_str()
            .unwrap()
            .contains("exit status: 1"));
        assert!(value["started_at"].as_str().is_some());
    }
}
