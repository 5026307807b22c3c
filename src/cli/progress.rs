//! Terminal progress for batch collection.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::collector::{CancellationFlag, CollectEvent};
use crate::matching::PromptInterrupt;
use crate::models::BatchResult;

/// Prints orchestrator events, behind a progress bar unless the batch is
/// interactive (prompts and a redrawing bar don't mix).
struct Reporter {
    bar: Option<ProgressBar>,
}

impl Reporter {
    fn new(total: usize, show_bar: bool) -> Self {
        let bar = show_bar.then(|| {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓░"),
            );
            pb
        });
        Self { bar }
    }

    fn line(&self, msg: String) {
        match &self.bar {
            Some(pb) => pb.println(msg),
            None => println!("{}", msg),
        }
    }

    fn message(&self, msg: String) {
        if let Some(pb) = &self.bar {
            pb.set_message(msg);
        }
    }

    fn advance(&self) {
        if let Some(pb) = &self.bar {
            pb.inc(1);
        }
    }

    fn handle(&self, event: CollectEvent) {
        match event {
            CollectEvent::QueryStarted {
                index,
                total,
                query,
            } => {
                if self.bar.is_none() {
                    println!("[{}/{}] {}", index, total, style(&query).bold());
                }
                self.message(query);
            }
            CollectEvent::Resolved { query, project } => {
                self.line(format!(
                    "  {} {} -> {} ({}, score {:.2})",
                    style("→").cyan(),
                    query,
                    project.title,
                    project.id,
                    project.score
                ));
            }
            CollectEvent::Collected {
                project_id,
                path,
                size,
                ..
            } => {
                self.advance();
                self.line(format!(
                    "  {} {} ({} bytes) {}",
                    style("✓").green(),
                    project_id,
                    size,
                    style(path.display()).dim()
                ));
            }
            CollectEvent::Failed { query, error, .. } => {
                self.advance();
                self.line(format!("  {} {}: {}", style("✗").red(), query, error));
            }
            CollectEvent::Waiting { delay } => {
                self.message(format!("waiting {:.1}s", delay.as_secs_f64()));
            }
            CollectEvent::Halted { processed, total } => {
                self.line(format!(
                    "{} Interrupted after {}/{} queries, keeping partial results",
                    style("!").yellow(),
                    processed,
                    total
                ));
            }
            CollectEvent::Saved { path } => {
                self.line(format!(
                    "{} Batch metadata saved to {}",
                    style("✓").green(),
                    path.display()
                ));
            }
        }
    }

    fn finish(&self) {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
    }
}

/// Consume events until the sender side is dropped.
pub fn spawn_reporter(
    mut rx: mpsc::Receiver<CollectEvent>,
    total: usize,
    show_bar: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reporter = Reporter::new(total, show_bar);
        while let Some(event) = rx.recv().await {
            reporter.handle(event);
        }
        reporter.finish();
    })
}

/// What one Ctrl-C did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Cancelled the open prompt; the batch goes on with the next query.
    Prompt,
    /// Asked the batch to stop before its next query.
    StopBatch,
    /// A repeated interrupt: leave now.
    Exit,
}

/// Route a Ctrl-C. An open prompt takes it first; otherwise the first one
/// stops the batch and any later one exits.
pub fn route_interrupt(prompt: &PromptInterrupt, flag: &CancellationFlag) -> Interrupt {
    if prompt.interrupt() {
        Interrupt::Prompt
    } else if flag.is_cancelled() {
        Interrupt::Exit
    } else {
        flag.cancel();
        Interrupt::StopBatch
    }
}

/// Listen for Ctrl-C until aborted, routing each one.
pub fn handle_interrupts(flag: CancellationFlag, prompt: PromptInterrupt) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match route_interrupt(&prompt, &flag) {
                Interrupt::Prompt => {}
                Interrupt::StopBatch => eprintln!(
                    "\n{} Interrupt received, stopping after the current query \
                     (Ctrl-C again to exit)...",
                    style("!").yellow()
                ),
                Interrupt::Exit => {
                    eprintln!("\n{} Interrupted", style("✗").red());
                    std::process::exit(130);
                }
            }
        }
    })
}

/// Print the collection summary.
pub fn print_summary(result: &BatchResult) {
    let stats = &result.statistics;
    println!("\n{}", style("Collection Summary").bold());
    println!("  Batch:              {}", result.batch_name);
    println!("  Requested:          {}", stats.projects_requested);
    println!("  Found:              {}", stats.projects_found);
    println!("  Downloaded:         {}", style(stats.projects_downloaded).green());
    println!("  Failed:             {}", stats.projects_failed);
    println!("  Search failures:    {}", stats.search_failures);
    println!("  Download failures:  {}", stats.download_failures);
    println!("  Validation failures: {}", stats.validation_failures);
    println!("  Success rate:       {:.1}%", stats.success_rate);
    println!("  Time:               {:.1}s", stats.total_execution_time_seconds);
    println!("  Output:             {}", result.output_directory.display());
    if result.halted {
        println!("  {}", style("Halted before all queries were processed").yellow());
    }
}
