//! Errors surfaced by a repair step

use std::path::PathBuf;

use thiserror::Error;

use super::BoxError;

/// A collaborator failure during repair.
///
/// Optimization flags are restored before any of these reaches the caller.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("loss evaluation failed: {0}")]
    Loss(#[source] BoxError),

    #[error("feasibility projection failed: {0}")]
    Projection(#[source] BoxError),

    #[error("failed to write snapshot '{}': {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("cannot prepare diagnostics directory '{}': {source}", path.display())]
    Diagnostics {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CleanupError {
    pub fn loss(err: impl Into<BoxError>) -> Self {
        CleanupError::Loss(err.into())
    }

    pub fn projection(err: impl Into<BoxError>) -> Self {
        CleanupError::Projection(err.into())
    }

    pub fn snapshot(path: impl Into<PathBuf>, err: impl Into<BoxError>) -> Self {
        CleanupError::Snapshot {
            path: path.into(),
            source: err.into(),
        }
    }
}
