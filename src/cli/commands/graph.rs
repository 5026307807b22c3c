//! Graph build and import commands.

use std::path::{Path, PathBuf};

use anyhow::bail;
use chrono::Local;
use console::style;

use crate::cli::Neo4jArgs;
use crate::config::Settings;
use crate::graph::{auto_version_name, ProcessOutput};

use super::{build_graph_builder, neo4j_config};

pub(crate) fn print_process_output(output: &ProcessOutput) {
    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
        println!("{}", style(stdout).dim());
    }
}

/// Build a graph version from XML records already on disk.
pub async fn cmd_build_graph(
    settings: &Settings,
    xml: &[PathBuf],
    version: Option<String>,
) -> anyhow::Result<()> {
    let missing: Vec<_> = xml.iter().filter(|p| !p.is_file()).collect();
    if !missing.is_empty() {
        for path in &missing {
            eprintln!("{} Not a file: {}", style("✗").red(), path.display());
        }
        bail!("{} input file(s) not found", missing.len());
    }

    let builder = build_graph_builder(settings)?;
    let version = version.unwrap_or_else(|| auto_version_name(Local::now()));

    println!(
        "{} Building graph version {} from {} document(s)",
        style("→").cyan(),
        version,
        xml.len()
    );
    let (version_dir, output) = builder.build(&version, xml).await?;
    print_process_output(&output);
    println!(
        "{} Graph version written to {}",
        style("✓").green(),
        version_dir.display()
    );
    Ok(())
}

/// Import a graph version into Neo4j.
pub async fn cmd_import(
    settings: &Settings,
    graph_db: &Path,
    args: &Neo4jArgs,
) -> anyhow::Result<()> {
    if !graph_db.is_dir() {
        bail!("Graph version directory not found: {}", graph_db.display());
    }

    let builder = build_graph_builder(settings)?;
    let neo4j = neo4j_config(settings, args);
    if neo4j.effective_dry_run() && !args.dry_run {
        println!(
            "{} No Neo4j password given, running a dry run",
            style("!").yellow()
        );
    }

    let output = builder.import(graph_db, &neo4j).await?;
    print_process_output(&output);
    println!(
        "{} Import of {} finished{}",
        style("✓").green(),
        graph_db.display(),
        if neo4j.effective_dry_run() { " (dry run)" } else { "" }
    );
    Ok(())
}
