//! Lazy campaign - benchmark campaign harness for the lazy_db workload
//!
//! This library drives an external benchmark generator through parameter
//! sweeps, claims the files each run leaves behind into a structured archive,
//! and turns that archive into throughput statistics and comparative charts.
//!
//! # Architecture
//!
//! - **Grid**: Ordered experiment points (lazy thresholds, blind-write frequencies, eager baseline)
//! - **Campaign**: Binds a grid to workload arguments and expected artifacts
//! - **Workload**: Runs the generator as a child process
//! - **Artifact**: Claims fixed-name output files into the archive
//! - **Runner**: Sequences invocations and harvesting
//! - **Metrics**: Throughput aggregates and latency CDFs
//! - **Report**: Summaries and charts of a finished campaign
//!
//! # Example
//!
//! ```rust,no_run
//! use lazy_campaign::artifact::ArtifactStore;
//! use lazy_campaign::campaign::{CampaignKind, CampaignPlan, Capture};
//! use lazy_campaign::config::CampaignConfig;
//! use lazy_campaign::runner::CampaignRunner;
//! use lazy_campaign::workload::ProcessWorkload;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CampaignConfig::default().with_repetitions(3);
//!     let plan = CampaignPlan::new(CampaignKind::CacheLocality, Capture::Throughput, config)?;
//!     let store = ArtifactStore::new(".", "final");
//!     let workload = ProcessWorkload::from_config(&plan.config().workload);
//!
//!     let runner = CampaignRunner::new(workload, store, plan);
//!     let outcome = runner.run_campaign().await?;
//!     println!("{} points failed", outcome.failures().count());
//!
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod campaign;
pub mod cli;
pub mod config;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod output;
pub mod report;
pub mod runner;
pub mod visualization;
pub mod workload;

// Re-export commonly used types
pub use artifact::{ArtifactStore, Retention};
pub use campaign::{CampaignKind, CampaignPlan, Capture};
pub use config::{CampaignConfig, RepetitionMode, WorkloadConfig};
pub use error::{HarnessError, Result};
pub use grid::{ExperimentPoint, Mode, ParameterGrid};
pub use metrics::{build_cdf, compute_throughput_stats, AggregateStat, CdfSeries};
pub use output::{CampaignManifest, CsvExporter, JsonExporter};
pub use runner::{CampaignOutcome, CampaignRunner};
pub use visualization::{ComparativePlotBuilder, PlotOptions};
pub use workload::{ProcessWorkload, Workload};
