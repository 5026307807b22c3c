//! Collect-then-build pipeline.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use tracing::info;

use super::{GraphBuilder, Neo4jConfig, ProcessOutput};
use crate::collector::CollectionOrchestrator;
use crate::models::BatchResult;

/// Name of the batch record copied into a graph version.
pub const COLLECTION_METADATA_FILE: &str = "cordis_collection_metadata.json";

/// Directory inside a graph version holding archived documents.
pub const SOURCE_ARCHIVE_DIR: &str = "source_xml";

/// Version name for unnamed runs: `v%Y-%m-%d-%H%M%S-cordis-auto`.
pub fn auto_version_name(now: DateTime<Local>) -> String {
    format!("v{}-cordis-auto", now.format("%Y-%m-%d-%H%M%S"))
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub version: Option<String>,
    pub interactive: bool,
    pub delay: Duration,
    /// Copy collected documents into the version's archive directory.
    pub keep_documents: bool,
    /// Run the import step after building.
    pub neo4j: Option<Neo4jConfig>,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub version: String,
    pub version_dir: PathBuf,
    pub batch: BatchResult,
    pub build_output: ProcessOutput,
    pub archived: Vec<PathBuf>,
    pub import_output: Option<ProcessOutput>,
}

/// Collect documents for `queries`, build a graph version from them and
/// optionally import it.
///
/// Fails when nothing was collected or a downstream step fails.
pub async fn run_pipeline(
    orchestrator: &CollectionOrchestrator,
    builder: &GraphBuilder,
    queries: &[String],
    options: &PipelineOptions,
) -> anyhow::Result<PipelineOutcome> {
    let version = options
        .version
        .clone()
        .unwrap_or_else(|| auto_version_name(Local::now()));
    info!("Pipeline version {} for {} queries", version, queries.len());

    let batch_name = format!("cordis_{}", version);
    let batch = orchestrator
        .run_batch(queries, options.interactive, options.delay, Some(&batch_name))
        .await?;

    if !batch.is_success() {
        bail!("No project documents were collected");
    }

    let documents = batch.document_paths();
    let (version_dir, build_output) = builder.build(&version, &documents).await?;
    tokio::fs::create_dir_all(&version_dir)
        .await
        .with_context(|| format!("creating {}", version_dir.display()))?;

    if let Some(metadata_path) = &batch.metadata_path {
        let dest = version_dir.join(COLLECTION_METADATA_FILE);
        tokio::fs::copy(metadata_path, &dest)
            .await
            .with_context(|| format!("copying batch metadata to {}", dest.display()))?;
        info!("Copied collection metadata to {}", dest.display());
    }

    let mut archived = Vec::new();
    if options.keep_documents {
        let archive_dir = version_dir.join(SOURCE_ARCHIVE_DIR);
        tokio::fs::create_dir_all(&archive_dir).await?;
        for doc in &documents {
            let Some(name) = doc.file_name() else {
                continue;
            };
            let dest = archive_dir.join(name);
            tokio::fs::copy(doc, &dest)
                .await
                .with_context(|| format!("archiving {}", doc.display()))?;
            archived.push(dest);
        }
        info!("Archived {} documents", archived.len());
    }

    let import_output = match &options.neo4j {
        Some(neo4j) => Some(builder.import(&version_dir, neo4j).await?),
        None => None,
    };

    Ok(PipelineOutcome {
        version,
        version_dir,
        batch,
        build_output,
        archived,
        import_output,
    })
}
