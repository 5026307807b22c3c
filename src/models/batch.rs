//! Batch collection results and statistics.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub projects_requested: usize,
    pub projects_found: usize,
    pub projects_downloaded: usize,
    pub projects_failed: usize,
    pub search_failures: usize,
    pub download_failures: usize,
    pub validation_failures: usize,
    pub total_execution_time_seconds: f64,
    /// Percentage of requested queries that produced a document.
    pub success_rate: f64,
}

impl BatchStatistics {
    /// Set timing and derived values once the batch loop is over.
    pub fn finalize(&mut self, elapsed_seconds: f64) {
        self.total_execution_time_seconds = elapsed_seconds;
        self.success_rate = if self.projects_requested > 0 {
            self.projects_downloaded as f64 / self.projects_requested as f64 * 100.0
        } else {
            0.0
        };
    }

    /// Record a per-query failure against the matching counter.
    pub fn record_failure(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::NotFound | FailureKind::Cancelled | FailureKind::SearchFailed => {
                self.search_failures += 1;
            }
            FailureKind::DownloadFailed => {
                self.download_failures += 1;
                self.projects_failed += 1;
            }
            FailureKind::ValidationFailed | FailureKind::SizeAnomaly => {
                self.validation_failures += 1;
                self.projects_failed += 1;
            }
        }
    }
}

/// One successfully collected project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub search_query: String,
    pub project_id: String,
    pub project_title: String,
    #[serde(default)]
    pub project_acronym: String,
    pub match_score: f64,
    pub document_path: PathBuf,
    pub document_size: u64,
    pub project_url: String,
}

/// Why a query did not produce a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Cancelled,
    SearchFailed,
    DownloadFailed,
    ValidationFailed,
    SizeAnomaly,
}

/// A query that failed, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub search_query: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Outcome of a batch run; persisted once as the batch metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_name: String,
    pub collection_date: DateTime<Utc>,
    pub output_directory: PathBuf,
    pub statistics: BatchStatistics,
    pub projects: Vec<ProjectRecord>,
    #[serde(default)]
    pub failures: Vec<QueryFailure>,
    /// The run was interrupted before every query was processed.
    #[serde(default)]
    pub halted: bool,
    /// Where this record was written (not serialized).
    #[serde(skip)]
    pub metadata_path: Option<PathBuf>,
}

impl BatchResult {
    /// A batch with no collected document is an overall failure.
    pub fn is_success(&self) -> bool {
        !self.projects.is_empty()
    }

    /// Paths of all collected documents, in query order.
    pub fn document_paths(&self) -> Vec<PathBuf> {
        self.projects
            .iter()
            .map(|p| p.document_path.clone())
            .collect()
    }
}
