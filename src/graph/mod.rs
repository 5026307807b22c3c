//! Downstream knowledge-graph build and Neo4j import.
//!
//! Both steps are external Python processes from the RAXKG project, run
//! with the RAXKG checkout as working directory and its `src/` on
//! `PYTHONPATH`.

mod pipeline;

pub use pipeline::{auto_version_name, run_pipeline, PipelineOptions, PipelineOutcome};

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Build step module.
pub const BUILD_MODULE: &str = "raxkg.populate_graph.build_graph_db";

/// Import step module.
pub const IMPORT_MODULE: &str = "raxkg.populate_graph.import_to_neo4j.import_graph_db";

pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_IMPORT_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";
pub const DEFAULT_NEO4J_USER: &str = "neo4j";

/// Errors that can occur while running downstream processes.
#[derive(Debug, Error)]
pub enum GraphBuildError {
    #[error("{step} failed with exit code {code:?}\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    BuildFailed {
        step: &'static str,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("{step} timed out after {}s", .timeout.as_secs())]
    Timeout {
        step: &'static str,
        timeout: Duration,
    },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No documents to build from")]
    NoDocuments,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Paths and limits for the downstream processes.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    /// Python interpreter.
    pub python: PathBuf,
    /// RAXKG checkout (working directory of both steps).
    pub raxkg_root: PathBuf,
    pub schema_path: PathBuf,
    /// Versions are created below this directory.
    pub graph_db_root: PathBuf,
    pub build_timeout: Duration,
    pub import_timeout: Duration,
}

impl GraphConfig {
    /// Defaults relative to a RAXKG checkout.
    pub fn for_root(raxkg_root: impl Into<PathBuf>) -> Self {
        let raxkg_root = raxkg_root.into();
        Self {
            python: default_python(),
            schema_path: raxkg_root.join("data").join("schema").join("latest_schema.json"),
            graph_db_root: raxkg_root.join("data").join("graph_db"),
            raxkg_root,
            build_timeout: DEFAULT_BUILD_TIMEOUT,
            import_timeout: DEFAULT_IMPORT_TIMEOUT,
        }
    }
}

/// First of `python3` / `python` found on PATH, else plain `python3`.
pub fn default_python() -> PathBuf {
    which::which("python3")
        .or_else(|_| which::which("python"))
        .unwrap_or_else(|_| PathBuf::from("python3"))
}

/// Look for a RAXKG checkout next to or above `cwd`, then under `home`.
/// A directory counts when it contains the `src/raxkg` package.
pub fn discover_raxkg_root(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let parent = cwd.parent();
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(parent) = parent {
        candidates.push(parent.join("COMMUTE-Knowledge-Graph"));
        candidates.push(parent.join("raxkg"));
        if let Some(grandparent) = parent.parent() {
            candidates.push(grandparent.join("raxkg"));
        }
    }
    if let Some(home) = home {
        candidates.push(home.join("raxkg"));
    }
    candidates.push(PathBuf::from("/workspace/SCAI/raxkg"));

    candidates.into_iter().find(|path| {
        let found = path.join("src").join("raxkg").is_dir();
        if found {
            debug!("Found RAXKG checkout at {}", path.display());
        }
        found
    })
}

/// Connection settings for the import step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: Option<String>,
    pub dry_run: bool,
}

impl Neo4jConfig {
    /// Without a password only a dry run is possible.
    pub fn effective_dry_run(&self) -> bool {
        self.dry_run || !matches!(self.password.as_deref(), Some(p) if !p.is_empty())
    }
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_NEO4J_URI.to_string(),
            user: DEFAULT_NEO4J_USER.to_string(),
            password: None,
            dry_run: true,
        }
    }
}

/// Output of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs the RAXKG build and import steps.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    config: GraphConfig,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Directory a version is built into.
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.config.graph_db_root.join(version)
    }

    /// Arguments passed to the interpreter for the build step.
    pub fn build_args(&self, version: &str, documents: &[PathBuf]) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-m".into(),
            BUILD_MODULE.into(),
            "--schema".into(),
            self.config.schema_path.clone().into(),
            "--root".into(),
            self.config.graph_db_root.clone().into(),
            "--version".into(),
            version.into(),
            "--source".into(),
            "cordis".into(),
        ];
        for doc in documents {
            args.push("--xml".into());
            args.push(doc.clone().into());
        }
        args
    }

    /// Arguments passed to the interpreter for the import step.
    pub fn import_args(&self, graph_db: &Path, neo4j: &Neo4jConfig) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-m".into(),
            IMPORT_MODULE.into(),
            "--graph-db".into(),
            graph_db.as_os_str().to_owned(),
            "--neo4j-uri".into(),
            neo4j.uri.clone().into(),
            "--user".into(),
            neo4j.user.clone().into(),
        ];
        if let Some(password) = neo4j.password.as_deref().filter(|p| !p.is_empty()) {
            args.push("--password".into());
            args.push(password.into());
        }
        if neo4j.effective_dry_run() {
            args.push("--dry-run".into());
        } else {
            args.push("--create-constraints".into());
        }
        args
    }

    /// `PYTHONPATH` with the RAXKG sources first.
    pub fn python_path(&self, existing: Option<OsString>) -> Result<OsString, GraphBuildError> {
        let mut paths = vec![self.config.raxkg_root.join("src")];
        if let Some(existing) = existing.filter(|e| !e.is_empty()) {
            paths.extend(std::env::split_paths(&existing));
        }
        std::env::join_paths(paths).map_err(|e| {
            GraphBuildError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })
    }

    async fn run(
        &self,
        step: &'static str,
        args: Vec<OsString>,
        timeout: Duration,
    ) -> Result<ProcessOutput, GraphBuildError> {
        let python_path = self.python_path(std::env::var_os("PYTHONPATH"))?;
        debug!(
            "Running {} -m {:?} in {}",
            self.config.python.display(),
            args.get(1),
            self.config.raxkg_root.display()
        );

        let child = Command::new(&self.config.python)
            .args(&args)
            .current_dir(&self.config.raxkg_root)
            .env("PYTHONPATH", python_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GraphBuildError::Spawn {
                program: self.config.python.display().to_string(),
                source,
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                error!("{} timed out after {}s", step, timeout.as_secs());
                return Err(GraphBuildError::Timeout { step, timeout });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            error!("{} failed with {:?}", step, output.status.code());
            return Err(GraphBuildError::BuildFailed {
                step,
                code: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(ProcessOutput { stdout, stderr })
    }

    /// Build a graph version from documents. Returns the version directory.
    pub async fn build(
        &self,
        version: &str,
        documents: &[PathBuf],
    ) -> Result<(PathBuf, ProcessOutput), GraphBuildError> {
        if documents.is_empty() {
            return Err(GraphBuildError::NoDocuments);
        }
        tokio::fs::create_dir_all(&self.config.graph_db_root).await?;

        info!(
            "Building graph version {} from {} documents",
            version,
            documents.len()
        );
        let output = self
            .run(
                "graph build",
                self.build_args(version, documents),
                self.config.build_timeout,
            )
            .await?;

        Ok((self.version_dir(version), output))
    }

    /// Import a built graph version into Neo4j (or dry-run it).
    pub async fn import(
        &self,
        graph_db: &Path,
        neo4j: &Neo4jConfig,
    ) -> Result<ProcessOutput, GraphBuildError> {
        info!(
            "Importing {} into {} (dry run: {})",
            graph_db.display(),
            neo4j.uri,
            neo4j.effective_dry_run()
        );
        self.run(
            "neo4j import",
            self.import_args(graph_db, neo4j),
            self.config.import_timeout,
        )
        .await
    }
}
