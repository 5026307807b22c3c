//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod commands;
mod progress;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "cordis")]
#[command(about = "Resolve CORDIS projects and acquire their XML records")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Output directory (overrides config file and environment)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Neo4j connection flags shared by `pipeline` and `import`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Neo4jArgs {
    /// Validate the import without writing to Neo4j
    #[arg(long)]
    dry_run: bool,
    /// Neo4j connection URI
    #[arg(long)]
    neo4j_uri: Option<String>,
    /// Neo4j user
    #[arg(long)]
    neo4j_user: Option<String>,
    /// Neo4j password (also read from NEO4J_PASSWORD)
    #[arg(long)]
    neo4j_password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve queries to CORDIS projects and download their XML records
    Collect {
        /// Project names or acronyms (comma-separated lists allowed)
        #[arg(required = true)]
        queries: Vec<String>,
        /// Batch name (default: cordis_batch_<timestamp>)
        #[arg(short, long)]
        batch_name: Option<String>,
        /// Ask which project to use when a query is ambiguous
        #[arg(short, long)]
        interactive: bool,
        /// Seconds to wait between queries
        #[arg(short, long)]
        delay: Option<f64>,
    },

    /// Collect projects, build a graph version from them and optionally import it
    Pipeline {
        /// Project names or acronyms (comma-separated lists allowed)
        #[arg(required = true)]
        queries: Vec<String>,
        /// Graph version name (default: v<timestamp>-cordis-auto)
        #[arg(long)]
        version: Option<String>,
        /// Ask which project to use when a query is ambiguous
        #[arg(short, long)]
        interactive: bool,
        /// Seconds to wait between queries
        #[arg(short, long)]
        delay: Option<f64>,
        /// Archive the collected XML inside the graph version
        #[arg(long)]
        keep_xml: bool,
        /// Import the built graph into Neo4j
        #[arg(long)]
        neo4j_import: bool,
        #[command(flatten)]
        neo4j: Neo4jArgs,
    },

    /// Show scored candidates for a query without downloading
    Search {
        /// Project name or acronym
        query: String,
        /// Maximum number of candidates to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Download and validate one project by its CORDIS id
    Fetch {
        /// CORDIS project id
        project_id: String,
        /// Only check whether the project record exists
        #[arg(long)]
        check: bool,
    },

    /// Build a graph version from existing XML records
    BuildGraph {
        /// XML documents to include
        #[arg(required = true)]
        xml: Vec<PathBuf>,
        /// Graph version name (default: v<timestamp>-cordis-auto)
        #[arg(long)]
        version: Option<String>,
    },

    /// Import a built graph version into Neo4j
    Import {
        /// Graph version directory
        graph_db: PathBuf,
        #[command(flatten)]
        neo4j: Neo4jArgs,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let explicit_output = cli.output.is_some();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        output_dir: cli.output,
    };
    let (settings, _config) = load_settings_with_options(options)
        .await
        .map_err(anyhow::Error::msg)
        .context("loading configuration")?;

    match cli.command {
        Commands::Collect {
            queries,
            batch_name,
            interactive,
            delay,
        } => {
            commands::collect::cmd_collect(
                &settings,
                &queries,
                batch_name.as_deref(),
                interactive,
                delay,
            )
            .await
        }
        Commands::Pipeline {
            queries,
            version,
            interactive,
            delay,
            keep_xml,
            neo4j_import,
            neo4j,
        } => {
            let args = commands::pipeline::PipelineArgs {
                queries,
                version,
                interactive,
                delay,
                keep_xml,
                neo4j_import,
                neo4j,
                explicit_output,
            };
            commands::pipeline::cmd_pipeline(&settings, args).await
        }
        Commands::Search { query, limit } => {
            commands::search::cmd_search(&settings, &query, limit).await
        }
        Commands::Fetch { project_id, check } => {
            commands::fetch::cmd_fetch(&settings, &project_id, check).await
        }
        Commands::BuildGraph { xml, version } => {
            commands::graph::cmd_build_graph(&settings, &xml, version).await
        }
        Commands::Import { graph_db, neo4j } => {
            commands::graph::cmd_import(&settings, &graph_db, &neo4j).await
        }
    }
}
