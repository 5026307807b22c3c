//! Collect, build and import in one run.

use std::path::PathBuf;

use anyhow::{bail, Context};
use console::style;
use tokio::sync::mpsc;

use crate::cli::progress::{handle_interrupts, print_summary, spawn_reporter};
use crate::cli::Neo4jArgs;
use crate::collector::{parse_queries, CancellationFlag};
use crate::config::Settings;
use crate::matching::PromptInterrupt;
use crate::graph::{run_pipeline, PipelineOptions};

use super::graph::print_process_output;
use super::{batch_delay, build_graph_builder, build_orchestrator, neo4j_config};

pub struct PipelineArgs {
    pub queries: Vec<String>,
    pub version: Option<String>,
    pub interactive: bool,
    pub delay: Option<f64>,
    pub keep_xml: bool,
    pub neo4j_import: bool,
    pub neo4j: Neo4jArgs,
    /// Collect into the output directory instead of a temporary one.
    pub explicit_output: bool,
}

pub async fn cmd_pipeline(settings: &Settings, args: PipelineArgs) -> anyhow::Result<()> {
    let queries = parse_queries(&args.queries);
    if queries.is_empty() {
        bail!("No queries given");
    }
    let delay = batch_delay(settings, args.delay)?;
    let builder = build_graph_builder(settings)?;

    // Held until the pipeline finishes; removed on drop.
    let scratch = if args.explicit_output {
        settings
            .ensure_directories()
            .context("preparing output directory")?;
        None
    } else {
        Some(
            tempfile::Builder::new()
                .prefix("cordis_pipeline_")
                .tempdir()
                .context("creating temporary collection directory")?,
        )
    };
    let output_dir: PathBuf = match &scratch {
        Some(dir) => dir.path().to_path_buf(),
        None => settings.output_dir.clone(),
    };

    let neo4j = args.neo4j_import.then(|| neo4j_config(settings, &args.neo4j));
    if let Some(config) = &neo4j {
        if config.effective_dry_run() && !args.neo4j.dry_run {
            println!(
                "{} No Neo4j password given, the import will be a dry run",
                style("!").yellow()
            );
        }
    }

    let options = PipelineOptions {
        version: args.version,
        interactive: args.interactive,
        delay,
        keep_documents: args.keep_xml,
        neo4j,
    };

    println!(
        "{} Pipeline: {} project(s), graph root {}",
        style("→").cyan(),
        queries.len(),
        builder.config().graph_db_root.display()
    );

    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationFlag::new();
    let prompt = PromptInterrupt::new();
    let orchestrator = build_orchestrator(settings, &output_dir, prompt.clone())?
        .with_events(tx)
        .with_cancellation(cancel.clone());

    let reporter = spawn_reporter(rx, queries.len(), !args.interactive);
    let interrupt = handle_interrupts(cancel, prompt);

    let outcome = run_pipeline(&orchestrator, &builder, &queries, &options).await;

    drop(orchestrator);
    let _ = reporter.await;
    interrupt.abort();

    let outcome = outcome.context("pipeline failed")?;
    print_summary(&outcome.batch);
    print_process_output(&outcome.build_output);

    println!(
        "\n{} Graph version {} built at {}",
        style("✓").green(),
        outcome.version,
        outcome.version_dir.display()
    );
    if !outcome.archived.is_empty() {
        println!(
            "  Archived {} XML document(s) with the version",
            outcome.archived.len()
        );
    }
    if let Some(output) = &outcome.import_output {
        print_process_output(output);
        println!("{} Neo4j import finished", style("✓").green());
    }
    Ok(())
}
