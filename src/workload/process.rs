//! External process workload

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::Workload;
use crate::config::WorkloadConfig;
use crate::error::{HarnessError, Result};
use crate::grid::ExperimentPoint;

/// Stdout markers of the generator's usage banner, printed with exit code 0
const USAGE_BANNERS: [&str; 2] = ["expects the following args", "Missing argument"];

/// Spawns the workload binary once per invocation
#[derive(Debug, Clone)]
pub struct ProcessWorkload {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessWorkload {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    pub fn from_config(config: &WorkloadConfig) -> Self {
        let workload = Self::new(&config.binary);
        match config.timeout_secs {
            Some(secs) => workload.with_timeout(Duration::from_secs(secs)),
            None => workload,
        }
    }

    /// Kill an invocation that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl Workload for ProcessWorkload {
    async fn invoke(
        &self,
        point: &ExperimentPoint,
        repetition: usize,
        args: &[String],
        working_dir: &Path,
    ) -> Result<()> {
        let failure = |reason: String| HarnessError::ProcessFailure {
            point: point.label(),
            repetition,
            reason,
        };

        info!(
            point = %point,
            repetition,
            binary = %self.binary.display(),
            "Invoking workload"
        );
        debug!(args = ?args, working_dir = %working_dir.display(), "Workload arguments");

        let child = Command::new(&self.binary)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failure(format!("cannot spawn '{}': {}", self.binary.display(), e)))?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    warn!(
                        point = %point,
                        repetition,
                        timeout_secs = limit.as_secs_f64(),
                        "Workload timed out, killing process"
                    );
                    return Err(failure(format!(
                        "timed out after {:.1}s",
                        limit.as_secs_f64()
                    )));
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| failure(format!("failed waiting for process: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!(point = %point, stream = "stdout", "{}", line);
        }
        for line in stderr.lines() {
            debug!(point = %point, stream = "stderr", "{}", line);
        }

        if !output.status.success() {
            let mut reason = output.status.to_string();
            if let Some(last) = stderr.lines().rev().find(|l| !l.trim().is_empty()) {
                reason.push_str(": ");
                reason.push_str(last.trim());
            }
            return Err(failure(reason));
        }

        if let Some(banner) = USAGE_BANNERS.iter().find(|b| stdout.contains(**b)) {
            return Err(failure(format!(
                "workload rejected its arguments ('{}')",
                banner
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "process"
    }
}
