//! Error types for the campaign harness

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigError;

/// Harness error type
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The workload process exited non-zero, was killed, timed out, or
    /// rejected its arguments
    #[error("workload failed for {point} (repetition {repetition}): {reason}")]
    ProcessFailure {
        point: String,
        repetition: usize,
        reason: String,
    },

    /// An artifact the workload should have written is absent or unmodified
    #[error("expected artifact '{}' was not produced", path.display())]
    MissingArtifact { path: PathBuf },

    /// Malformed or empty numeric content
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A throughput sample with zero elapsed time
    #[error("{}:{line}: elapsed time is zero, throughput is undefined", path.display())]
    DivideByZero { path: PathBuf, line: usize },

    /// Claim/move failure, including destination collisions
    #[error("file system error on '{}': {message}", path.display())]
    FileSystem {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The archive directory could not be created
    #[error("failed to create directory '{}': {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, HarnessError>;

impl HarnessError {
    pub(crate) fn parse(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn fs(path: &Path, message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.to_path_buf(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 1,
            Self::DirectoryCreation { .. } => 2,
            Self::ProcessFailure { .. } => 3,
            Self::MissingArtifact { .. } => 4,
            Self::Parse { .. } | Self::DivideByZero { .. } => 5,
            Self::FileSystem { .. } => 6,
        }
    }

    /// Whether the error belongs to a single aggregated series rather than
    /// to the campaign as a whole
    pub fn is_series_local(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::DivideByZero { .. } | Self::MissingArtifact { .. }
        )
    }
}

/// Map an application error to an exit code by finding the first
/// [`HarnessError`] in its cause chain
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<HarnessError>())
        .map(HarnessError::exit_code)
        .unwrap_or(1)
}
