//! Workload implementations
//!
//! A workload runs one invocation of the benchmark generator for an
//! experiment point and reports whether it exited cleanly. Its output files
//! are harvested separately by the runner.

pub mod process;

pub use process::ProcessWorkload;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::grid::ExperimentPoint;

/// Workload trait that all generators must implement
#[async_trait]
pub trait Workload: Send + Sync {
    /// Run one repetition of `point` with `args` in `working_dir` and wait
    /// for it to finish
    async fn invoke(
        &self,
        point: &ExperimentPoint,
        repetition: usize,
        args: &[String],
        working_dir: &Path,
    ) -> Result<()>;

    /// Get the workload name
    fn name(&self) -> &str;
}
