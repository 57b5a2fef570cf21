//! Campaign runner orchestration
//!
//! The runner owns the fixed-name slots of the working directory and
//! coordinates, for every experiment point:
//! - Slot precondition checks
//! - Sequential workload invocations
//! - Harvesting each invocation's artifacts before the next one starts
//! - Quarantining untrusted leftovers after a failure

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::artifact::{ArtifactSpec, ArtifactStore, SlotState};
use crate::campaign::CampaignPlan;
use crate::error::{HarnessError, Result};
use crate::grid::ExperimentPoint;
use crate::workload::Workload;

/// What happened to one experiment point
#[derive(Debug)]
pub struct PointRecord {
    pub point: ExperimentPoint,
    pub arguments: Vec<String>,
    pub repetitions: usize,
    /// Invocations that exited cleanly and were harvested
    pub completed: usize,
    /// Archive paths, in the order they were claimed
    pub archived: Vec<PathBuf>,
    pub failure: Option<HarnessError>,
}

impl PointRecord {
    fn new(point: &ExperimentPoint, repetitions: usize) -> Self {
        Self {
            point: point.clone(),
            arguments: Vec::new(),
            repetitions,
            completed: 0,
            archived: Vec::new(),
            failure: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Records of every point of a campaign, in grid order
#[derive(Debug, Default)]
pub struct CampaignOutcome {
    pub records: Vec<PointRecord>,
}

impl CampaignOutcome {
    pub fn failures(&self) -> impl Iterator<Item = &PointRecord> {
        self.records.iter().filter(|r| !r.succeeded())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Exit code of the first failed point, if any
    pub fn exit_code(&self) -> Option<u8> {
        self.failures()
            .find_map(|r| r.failure.as_ref())
            .map(HarnessError::exit_code)
    }
}

/// Runner for executing campaigns
pub struct CampaignRunner<W: Workload> {
    workload: W,
    store: ArtifactStore,
    plan: CampaignPlan,
    show_progress: bool,
}

impl<W: Workload> CampaignRunner<W> {
    /// Create a new campaign runner
    pub fn new(workload: W, store: ArtifactStore, plan: CampaignPlan) -> Self {
        Self {
            workload,
            store,
            plan,
            show_progress: true,
        }
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn plan(&self) -> &CampaignPlan {
        &self.plan
    }

    /// Run `point` `repetitions` times, returning the archived paths
    pub async fn run(&self, point: &ExperimentPoint, repetitions: usize) -> Result<Vec<PathBuf>> {
        self.store.ensure_archive_dir()?;
        let record = self.run_point(point, repetitions, &ProgressBar::hidden()).await;
        match record.failure {
            Some(e) => Err(e),
            None => Ok(record.archived),
        }
    }

    /// Run every group of the plan's grid in order
    ///
    /// A failed point is recorded and the campaign moves on; only a missing
    /// archive directory stops it up front.
    pub async fn run_campaign(&self) -> Result<CampaignOutcome> {
        self.store.ensure_archive_dir()?;

        let grid = self.plan.grid();
        info!(
            campaign = %self.plan.kind(),
            points = grid.len(),
            invocations = grid.total_invocations(),
            workload = self.workload.name(),
            archive = %self.store.archive_dir().display(),
            "Starting campaign"
        );

        let pb = self.progress_bar(grid.total_invocations() as u64);
        let mut outcome = CampaignOutcome::default();

        for group in grid.iter() {
            pb.set_message(group.point.label());
            let record = self.run_point(&group.point, group.repetitions, &pb).await;
            outcome.records.push(record);
        }

        let failed = outcome.failures().count();
        pb.finish_with_message("Campaign complete");
        info!(
            points = outcome.records.len(),
            failed, "Campaign finished"
        );

        Ok(outcome)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }

    async fn run_point(
        &self,
        point: &ExperimentPoint,
        repetitions: usize,
        pb: &ProgressBar,
    ) -> PointRecord {
        let mut record = PointRecord::new(point, repetitions);
        info!(point = %point, repetitions, "Running point");

        let specs = self.plan.artifacts(point);
        let result = match self.plan.arguments(point) {
            Ok(args) => {
                record.arguments = args;
                self.execute(&specs, &mut record, pb).await
            }
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            error!(
                point = %point,
                completed = record.completed,
                error = %e,
                "Point failed, remaining repetitions skipped"
            );
            pb.inc((repetitions - record.completed) as u64);
            for spec in &specs {
                if let Err(qe) = self.store.quarantine(&spec.raw_name, &point.label()) {
                    warn!(artifact = %spec.raw_name, error = %qe, "Could not quarantine leftover");
                }
            }
            record.failure = Some(e);
        }

        record
    }

    async fn execute(
        &self,
        specs: &[ArtifactSpec],
        record: &mut PointRecord,
        pb: &ProgressBar,
    ) -> Result<()> {
        let point = record.point.clone();
        let repetitions = record.repetitions;

        for spec in specs {
            if let SlotState::Occupied { len } = self.store.slot(&spec.raw_name)? {
                return Err(HarnessError::FileSystem {
                    path: self.store.slot_path(&spec.raw_name),
                    message: format!(
                        "stale artifact ({} bytes) occupies the slot before the first invocation",
                        len
                    ),
                    source: None,
                });
            }
        }

        // Slot length of each batch-harvested artifact after the last invocation
        let mut batch_len = vec![0u64; specs.len()];

        for rep in 0..repetitions {
            self.workload
                .invoke(&point, rep, &record.arguments, self.store.working_dir())
                .await?;

            for (idx, spec) in specs.iter().enumerate() {
                if self.plan.harvest_per_repetition(spec) {
                    let name = self.plan.archive_name(spec, Some(rep), repetitions);
                    let archived = self
                        .store
                        .claim(&spec.raw_name, &self.store.archive_path(&name))?;
                    record.archived.push(archived);
                    continue;
                }

                let slot_path = self.store.slot_path(&spec.raw_name);
                match self.store.slot(&spec.raw_name)? {
                    SlotState::Occupied { len } if len > batch_len[idx] => batch_len[idx] = len,
                    _ => return Err(HarnessError::MissingArtifact { path: slot_path }),
                }
            }

            record.completed += 1;
            pb.inc(1);
            debug!(point = %point, repetition = rep, "Repetition harvested");
        }

        for spec in specs {
            if !self.plan.harvest_per_repetition(spec) {
                let name = self.plan.archive_name(spec, None, repetitions);
                let archived = self
                    .store
                    .claim(&spec.raw_name, &self.store.archive_path(&name))?;
                record.archived.push(archived);
            }
        }

        Ok(())
    }
}
