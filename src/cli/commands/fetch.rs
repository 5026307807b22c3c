//! Direct acquisition by project id.

use anyhow::{bail, Context};
use console::style;

use crate::config::Settings;

use super::build_acquisition;

/// Download and validate a single project record.
pub async fn cmd_fetch(settings: &Settings, project_id: &str, check: bool) -> anyhow::Result<()> {
    let project_id = project_id.trim();
    if project_id.is_empty() {
        bail!("Project id must not be empty");
    }

    let client = build_acquisition(settings, &settings.output_dir)?;

    if check {
        if client.project_exists(project_id).await {
            println!("{} Project {} exists", style("✓").green(), project_id);
            return Ok(());
        }
        bail!("Project {} was not found", project_id);
    }

    settings
        .ensure_directories()
        .context("preparing output directory")?;

    let acquired = client.acquire(project_id).await?;
    let metadata = &acquired.metadata;

    println!(
        "{} Saved project {} to {} ({} bytes)",
        style("✓").green(),
        project_id,
        metadata.file_path.display(),
        metadata.file_size
    );
    for (field, value) in &metadata.fields {
        println!("  {:<16} {}", style(format!("{}:", field)).dim(), value);
    }
    println!("  {:<16} {}", style("sha256:").dim(), metadata.content_hash);
    for warning in &acquired.document.warnings {
        println!("  {} {}", style("!").yellow(), warning);
    }
    Ok(())
}
