//! Candidate inspection command.

use console::style;

use crate::config::Settings;
use crate::matching::PromptInterrupt;

use super::build_resolver;

/// Print scored candidates for `query` without downloading anything.
pub async fn cmd_search(settings: &Settings, query: &str, limit: usize) -> anyhow::Result<()> {
    let resolver = build_resolver(settings, PromptInterrupt::new());
    let candidates = resolver.candidates(query).await?;

    if candidates.is_empty() {
        println!("{} No projects found for '{}'", style("✗").red(), query);
        return Ok(());
    }

    println!(
        "{} {} candidate(s) for '{}':",
        style("→").cyan(),
        candidates.len(),
        query
    );
    for (i, candidate) in candidates.iter().take(limit).enumerate() {
        let score = format!("{:.2}", candidate.score);
        let score = if candidate.score > settings.accept_threshold {
            style(score).green()
        } else {
            style(score).yellow()
        };
        println!(
            "  {:>2}. [{}] {} {}",
            i + 1,
            score,
            candidate.title(),
            style(format!("({})", candidate.match_type.as_str())).dim()
        );
        println!(
            "      {} {}  {}",
            style("ID:").dim(),
            candidate.id(),
            style(&candidate.record.url).dim()
        );
    }
    Ok(())
}
