//! Batch collection: resolve and acquire a list of queries in order.

mod cancel;

pub use cancel::CancellationFlag;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::acquisition::AcquisitionClient;
use crate::matching::{MatchResolver, ResolveError};
use crate::models::{
    BatchResult, BatchStatistics, FailureKind, ProjectRecord, QueryFailure, ResolvedProject,
};
use crate::storage::{batch_metadata_path, save_json};

/// Default pause between queries.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum CollectEvent {
    /// Processing of a query began (`index` is 1-based).
    QueryStarted {
        index: usize,
        total: usize,
        query: String,
    },
    /// The query resolved to a project.
    Resolved {
        query: String,
        project: ResolvedProject,
    },
    /// The project document was acquired.
    Collected {
        query: String,
        project_id: String,
        path: PathBuf,
        size: u64,
    },
    /// The query produced no document.
    Failed {
        query: String,
        kind: FailureKind,
        error: String,
    },
    /// Sleeping before the next query.
    Waiting { delay: Duration },
    /// The batch stopped early on request.
    Halted { processed: usize, total: usize },
    /// Batch metadata was written.
    Saved { path: PathBuf },
}

/// Default batch name: `cordis_batch_%Y%m%d_%H%M%S` in local time.
pub fn default_batch_name(now: DateTime<Local>) -> String {
    format!("cordis_batch_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Split comma-separated arguments into trimmed, non-empty queries.
pub fn parse_queries<S: AsRef<str>>(inputs: &[S]) -> Vec<String> {
    inputs
        .iter()
        .flat_map(|input| input.as_ref().split(','))
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

fn resolve_failure_kind(error: &ResolveError) -> FailureKind {
    match error {
        ResolveError::NotFound { .. } => FailureKind::NotFound,
        ResolveError::Cancelled { .. } => FailureKind::Cancelled,
        ResolveError::Search(_) => FailureKind::SearchFailed,
    }
}

/// Drives a batch of queries through resolution and acquisition.
pub struct CollectionOrchestrator {
    resolver: MatchResolver,
    acquisition: AcquisitionClient,
    cancel: CancellationFlag,
    events: Option<mpsc::Sender<CollectEvent>>,
}

impl CollectionOrchestrator {
    pub fn new(resolver: MatchResolver, acquisition: AcquisitionClient) -> Self {
        Self {
            resolver,
            acquisition,
            cancel: CancellationFlag::new(),
            events: None,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<CollectEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Stop between queries once `flag` is cancelled.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    pub fn output_dir(&self) -> PathBuf {
        self.acquisition.output_dir().to_path_buf()
    }

    async fn emit(&self, event: CollectEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Process one query. Failures are recorded, never propagated.
    async fn collect_one(
        &self,
        query: &str,
        interactive: bool,
        stats: &mut BatchStatistics,
    ) -> Result<ProjectRecord, QueryFailure> {
        let resolved = match self.resolver.resolve(query, interactive).await {
            Ok(resolved) => resolved,
            Err(e) => {
                let kind = resolve_failure_kind(&e);
                stats.record_failure(kind);
                return Err(QueryFailure {
                    search_query: query.to_string(),
                    kind,
                    reason: e.to_string(),
                });
            }
        };

        stats.projects_found += 1;
        info!(
            "Resolved '{}' to project {} ({:.2})",
            query, resolved.id, resolved.score
        );
        self.emit(CollectEvent::Resolved {
            query: query.to_string(),
            project: resolved.clone(),
        })
        .await;

        let acquired = match self.acquisition.acquire(&resolved.id).await {
            Ok(acquired) => acquired,
            Err(e) => {
                let kind = e.failure_kind();
                stats.record_failure(kind);
                return Err(QueryFailure {
                    search_query: query.to_string(),
                    kind,
                    reason: e.to_string(),
                });
            }
        };

        stats.projects_downloaded += 1;
        let metadata = acquired.metadata;
        let project_title = metadata
            .title()
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or(resolved.title);

        Ok(ProjectRecord {
            search_query: query.to_string(),
            project_id: resolved.id,
            project_title,
            project_acronym: metadata.acronym().unwrap_or_default().to_string(),
            match_score: resolved.score,
            document_path: metadata.file_path.clone(),
            document_size: metadata.file_size,
            project_url: resolved.url,
        })
    }

    /// Run a batch. Queries are processed sequentially with `delay` between
    /// them (never after the last). The batch record is always written to
    /// `{output_dir}/{batch_name}_metadata.json`; only a failure to write it
    /// is an error.
    pub async fn run_batch(
        &self,
        queries: &[String],
        interactive: bool,
        delay: Duration,
        batch_name: Option<&str>,
    ) -> anyhow::Result<BatchResult> {
        let started = Instant::now();
        let collection_date = Utc::now();
        let batch_name = batch_name
            .map(str::to_string)
            .unwrap_or_else(|| default_batch_name(Local::now()));
        let total = queries.len();

        let mut stats = BatchStatistics {
            projects_requested: total,
            ..Default::default()
        };
        let mut projects = Vec::new();
        let mut failures = Vec::new();
        let mut halted = false;

        info!("Starting batch '{}' with {} queries", batch_name, total);

        for (i, query) in queries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                halted = true;
                self.emit(CollectEvent::Halted { processed: i, total }).await;
                warn!("Batch '{}' halted after {}/{} queries", batch_name, i, total);
                break;
            }

            self.emit(CollectEvent::QueryStarted {
                index: i + 1,
                total,
                query: query.clone(),
            })
            .await;

            match self.collect_one(query, interactive, &mut stats).await {
                Ok(record) => {
                    self.emit(CollectEvent::Collected {
                        query: query.clone(),
                        project_id: record.project_id.clone(),
                        path: record.document_path.clone(),
                        size: record.document_size,
                    })
                    .await;
                    projects.push(record);
                }
                Err(failure) => {
                    warn!("Query '{}' failed: {}", query, failure.reason);
                    self.emit(CollectEvent::Failed {
                        query: query.clone(),
                        kind: failure.kind,
                        error: failure.reason.clone(),
                    })
                    .await;
                    failures.push(failure);
                }
            }

            if i + 1 < total && !delay.is_zero() && !self.cancel.is_cancelled() {
                self.emit(CollectEvent::Waiting { delay }).await;
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        stats.finalize(started.elapsed().as_secs_f64());

        let output_directory = self.output_dir();
        let mut result = BatchResult {
            batch_name,
            collection_date,
            output_directory,
            statistics: stats,
            projects,
            failures,
            halted,
            metadata_path: None,
        };

        let path = batch_metadata_path(&result.output_directory, &result.batch_name);
        save_json(&path, &result).await?;
        info!("Saved batch metadata to {}", path.display());
        self.emit(CollectEvent::Saved { path: path.clone() }).await;
        result.metadata_path = Some(path);

        Ok(result)
    }
}
