use thiserror::Error;

use crate::models::FailureKind;

/// Errors that can occur while acquiring a project document.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Download failed for project {project_id}: {reason}")]
    DownloadFailed { project_id: String, reason: String },

    #[error("Validation failed for project {project_id}: {reason}")]
    ValidationFailed { project_id: String, reason: String },

    #[error("Document for project {project_id} is too small ({size} bytes)")]
    SizeAnomaly { project_id: String, size: u64 },

    #[error("I/O error for project {project_id}: {source}")]
    Io {
        project_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AcquisitionError {
    pub(crate) fn download(project_id: &str, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            project_id: project_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(project_id: &str, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            project_id: project_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(project_id: &str, source: std::io::Error) -> Self {
        Self::Io {
            project_id: project_id.to_string(),
            source,
        }
    }

    /// Batch counter this error is recorded under. Local I/O problems count
    /// as download failures.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::DownloadFailed { .. } | Self::Io { .. } | Self::Config(_) => {
                FailureKind::DownloadFailed
            }
            Self::ValidationFailed { .. } => FailureKind::ValidationFailed,
            Self::SizeAnomaly { .. } => FailureKind::SizeAnomaly,
        }
    }
}
