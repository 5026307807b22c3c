//! Batch collection command.

use anyhow::{bail, Context};
use console::style;
use tokio::sync::mpsc;

use crate::cli::progress::{handle_interrupts, print_summary, spawn_reporter};
use crate::collector::{parse_queries, CancellationFlag};
use crate::config::Settings;
use crate::matching::PromptInterrupt;

use super::{batch_delay, build_orchestrator};

/// Resolve and download every query, then print a summary.
pub async fn cmd_collect(
    settings: &Settings,
    raw_queries: &[String],
    batch_name: Option<&str>,
    interactive: bool,
    delay: Option<f64>,
) -> anyhow::Result<()> {
    let queries = parse_queries(raw_queries);
    if queries.is_empty() {
        bail!("No queries given");
    }
    let delay = batch_delay(settings, delay)?;

    settings
        .ensure_directories()
        .context("preparing output directory")?;

    println!(
        "{} Collecting {} project(s) into {}",
        style("→").cyan(),
        queries.len(),
        settings.output_dir.display()
    );

    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationFlag::new();
    let prompt = PromptInterrupt::new();
    let orchestrator = build_orchestrator(settings, &settings.output_dir, prompt.clone())?
        .with_events(tx)
        .with_cancellation(cancel.clone());

    let reporter = spawn_reporter(rx, queries.len(), !interactive);
    let interrupt = handle_interrupts(cancel, prompt);

    let result = orchestrator
        .run_batch(&queries, interactive, delay, batch_name)
        .await;

    // Closing the channel lets the reporter drain and exit.
    drop(orchestrator);
    let _ = reporter.await;
    interrupt.abort();

    let result = result.context("collection failed")?;
    print_summary(&result);

    if !result.is_success() {
        bail!("No project documents were collected");
    }
    Ok(())
}
