//! CLI argument parsing and command handling

use crate::artifact::ArtifactStore;
use crate::campaign::{CampaignKind, CampaignPlan, Capture};
use crate::config::{CampaignConfig, RepetitionMode};
use crate::error::exit_code_for;
use crate::output::{CampaignManifest, CsvExporter, JsonExporter};
use crate::report::{CampaignReport, SeriesFailure, ThroughputSummary};
use crate::runner::{CampaignOutcome, CampaignRunner};
use crate::workload::ProcessWorkload;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

/// Lazy campaign - benchmark campaign harness for the lazy_db workload
#[derive(Parser, Debug)]
#[command(name = "lazy-campaign")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Campaign to run: 0 or "cache" (cache locality), 1 or "blind" (blind writes)
    pub campaign: CampaignKind,

    /// Archive directory, created if absent (default: final, blind or client)
    pub output_dir: Option<PathBuf>,

    /// Capture client-observed latency instead of throughput
    #[arg(long)]
    pub client_latency: bool,

    /// Path to the workload binary
    #[arg(long, env = "LAZY_DB_BINARY")]
    pub binary: Option<PathBuf>,

    /// JSON campaign configuration; every field is optional
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Repetitions per experiment point
    #[arg(long)]
    pub repetitions: Option<usize>,

    /// How repetitions are harvested and aggregated
    #[arg(long, value_enum)]
    pub repetition_mode: Option<RepetitionMode>,

    /// Directory the workload runs in and writes its output to
    #[arg(long)]
    pub working_dir: Option<PathBuf>,

    /// Kill a workload invocation after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Only aggregate and chart an existing archive
    #[arg(long)]
    pub skip_run: bool,

    /// Skip chart rendering
    #[arg(long)]
    pub no_plot: bool,

    /// Export the throughput summary to JSON
    #[arg(long)]
    pub json: bool,

    /// Export the throughput summary to CSV
    #[arg(long)]
    pub csv: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn capture(&self) -> Capture {
        if self.client_latency {
            Capture::ClientLatency
        } else {
            Capture::Throughput
        }
    }

    /// Archive directory of this run
    pub fn archive_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            PathBuf::from(self.campaign.default_archive_dir(self.capture()))
        })
    }

    /// Campaign configuration with command-line overrides applied
    pub fn campaign_config(&self) -> Result<CampaignConfig> {
        let mut config = match &self.config {
            Some(path) => CampaignConfig::from_file(path)?,
            None => CampaignConfig::default(),
        };

        if let Some(binary) = &self.binary {
            config.workload.binary = binary.clone();
        }
        if let Some(repetitions) = self.repetitions {
            config.repetitions = repetitions;
            config.client_repetitions = repetitions;
        }
        if let Some(mode) = self.repetition_mode {
            config.repetition_mode = mode;
        }
        if let Some(dir) = &self.working_dir {
            config.working_dir = dir.clone();
        }
        if let Some(secs) = self.timeout {
            config.workload.timeout_secs = Some(secs);
        }

        // The workload runs inside the working directory, so a relative
        // path to it must be anchored here first
        let binary = &config.workload.binary;
        if binary.is_relative() && binary.components().count() > 1 {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            config.workload.binary = cwd.join(binary);
        }

        Ok(config)
    }

    /// Run the campaign and report; returns the process exit code
    pub async fn run(&self) -> Result<u8> {
        let plan = CampaignPlan::new(self.campaign, self.capture(), self.campaign_config()?)?;
        let archive_dir = self.archive_dir();
        let config = plan.config();

        tracing::info!(
            campaign = %plan.kind(),
            capture = ?plan.capture(),
            archive = %archive_dir.display(),
            "Starting lazy campaign"
        );

        println!("\n{}", "=".repeat(70));
        println!("   Lazy Campaign - {} ({:?})", plan.kind(), plan.capture());
        println!("{}", "=".repeat(70));
        println!();
        println!("Configuration:");
        println!("  Binary:       {}", config.workload.binary.display());
        println!("  Working dir:  {}", config.working_dir.display());
        println!("  Archive:      {}", archive_dir.display());
        println!("  Points:       {}", plan.grid().len());
        println!("  Invocations:  {}", plan.grid().total_invocations());
        println!("  Repetitions:  {:?}", config.repetition_mode);
        println!("{}", "=".repeat(70));
        println!();

        let mut exit_code = 0;

        if self.skip_run {
            tracing::info!("Skipping workload invocations");
        } else {
            let store = ArtifactStore::new(&config.working_dir, &archive_dir);
            let workload = ProcessWorkload::from_config(&config.workload);
            let runner = CampaignRunner::new(workload, store, plan.clone());

            let started_at = Utc::now();
            let outcome = runner.run_campaign().await?;
            let finished_at = Utc::now();

            let manifest_path = archive_dir.join("manifest.json");
            CampaignManifest::from_outcome(&plan, &archive_dir, started_at, finished_at, &outcome)
                .write(&manifest_path)
                .with_context(|| format!("Failed to write manifest to: {}", manifest_path.display()))?;

            println!();
            self.print_outcome(&outcome);
            exit_code = outcome.exit_code().unwrap_or(0);
        }

        let report = CampaignReport::new(&plan, &archive_dir);
        let (summaries, mut failures) = match report.throughput_summaries() {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "Throughput summary failed");
                println!("✗ Throughput summary failed: {}", e);
                keep_first(&mut exit_code, e.exit_code());
                (Vec::new(), Vec::new())
            }
        };
        if !summaries.is_empty() {
            self.print_summaries(&summaries);
        }

        if self.json {
            let path = archive_dir.join("summary.json");
            JsonExporter::export(&plan, &summaries, &path)
                .with_context(|| format!("Failed to export JSON to: {}", path.display()))?;
            println!("✓ JSON exported to: {}", path.display());
        }

        if self.csv {
            let path = archive_dir.join("summary.csv");
            CsvExporter::export(&summaries, &path)
                .with_context(|| format!("Failed to export CSV to: {}", path.display()))?;
            println!("✓ CSV exported to: {}", path.display());
        }

        if !self.no_plot {
            println!("\nGenerating plots...");
            match report.render_charts(&summaries, &archive_dir) {
                Ok(charts) => {
                    for path in &charts.rendered {
                        println!("✓ Chart: {}", path.display());
                    }
                    for name in &charts.skipped {
                        println!("✗ Chart skipped, no valid series: {}", name);
                    }
                    for failed in &charts.errors {
                        println!("✗ Chart {} failed: {:#}", failed.chart, failed.error);
                        keep_first(&mut exit_code, exit_code_for(&failed.error));
                    }
                    failures.extend(charts.failures);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Chart rendering failed");
                    println!("✗ Chart rendering failed: {:#}", e);
                    keep_first(&mut exit_code, exit_code_for(&e));
                }
            }
        }

        if !failures.is_empty() {
            self.print_failures(&failures);
            keep_first(&mut exit_code, failures[0].error.exit_code());
        }

        Ok(exit_code)
    }

    fn print_outcome(&self, outcome: &CampaignOutcome) {
        println!("{}", "=".repeat(70));
        println!("   Campaign Results");
        println!("{}", "=".repeat(70));
        for record in &outcome.records {
            match &record.failure {
                None => println!(
                    "  ✓ {:<24} {}/{} repetitions",
                    record.point.label(),
                    record.completed,
                    record.repetitions
                ),
                Some(e) => println!(
                    "  ✗ {:<24} {}/{} repetitions: {}",
                    record.point.label(),
                    record.completed,
                    record.repetitions,
                    e
                ),
            }
        }
        println!();
    }

    fn print_summaries(&self, summaries: &[ThroughputSummary]) {
        println!("📊 Throughput (txns/s):");
        println!(
            "  {:<24} {:>14} {:>14} {:>14} {:>8}",
            "point", "avg", "min", "max", "samples"
        );
        for s in summaries {
            println!(
                "  {:<24} {:>14.2} {:>14.2} {:>14.2} {:>8}",
                s.label, s.stat.avg, s.stat.min, s.stat.max, s.stat.samples
            );
        }
        println!();
    }

    fn print_failures(&self, failures: &[SeriesFailure]) {
        println!("\n⚠️  Series left out:");
        for failure in failures {
            println!("  {} / {}: {}", failure.chart, failure.series, failure.error);
        }
        println!();
    }
}

/// Record `code` unless an earlier step already failed
fn keep_first(exit_code: &mut u8, code: u8) {
    if *exit_code == 0 {
        *exit_code = code;
    }
}
