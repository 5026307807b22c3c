//! Command implementations and the wiring they share.

pub mod collect;
pub mod fetch;
pub mod graph;
pub mod pipeline;
pub mod search;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use super::Neo4jArgs;
use crate::acquisition::AcquisitionClient;
use crate::collector::CollectionOrchestrator;
use crate::config::Settings;
use crate::graph::{GraphBuilder, Neo4jConfig};
use crate::matching::{MatchResolver, PromptInterrupt, TerminalChooser};

/// Resolver wired to the configured search backend and a terminal chooser
/// that `prompt` can interrupt.
pub(crate) fn build_resolver(settings: &Settings, prompt: PromptInterrupt) -> MatchResolver {
    MatchResolver::new(
        Arc::new(settings.search_provider()),
        Arc::new(TerminalChooser::new(prompt)),
    )
    .with_search_limit(settings.search_limit)
    .with_accept_threshold(settings.accept_threshold)
}

pub(crate) fn build_acquisition(
    settings: &Settings,
    output_dir: &Path,
) -> anyhow::Result<AcquisitionClient> {
    AcquisitionClient::new(settings.acquisition_config(output_dir))
        .context("creating acquisition client")
}

pub(crate) fn build_orchestrator(
    settings: &Settings,
    output_dir: &Path,
    prompt: PromptInterrupt,
) -> anyhow::Result<CollectionOrchestrator> {
    Ok(CollectionOrchestrator::new(
        build_resolver(settings, prompt),
        build_acquisition(settings, output_dir)?,
    ))
}

pub(crate) fn build_graph_builder(settings: &Settings) -> anyhow::Result<GraphBuilder> {
    let config = settings.graph_config().map_err(anyhow::Error::msg)?;
    Ok(GraphBuilder::new(config))
}

/// `--delay` in seconds, falling back to the configured delay.
pub(crate) fn batch_delay(settings: &Settings, delay: Option<f64>) -> anyhow::Result<Duration> {
    match delay {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .with_context(|| format!("invalid delay: {}", secs)),
        None => Ok(settings.batch_delay()),
    }
}

/// Neo4j settings with command-line flags taking precedence.
pub(crate) fn neo4j_config(settings: &Settings, args: &Neo4jArgs) -> Neo4jConfig {
    let mut config = settings.neo4j_config();
    if let Some(uri) = &args.neo4j_uri {
        config.uri = uri.clone();
    }
    if let Some(user) = &args.neo4j_user {
        config.user = user.clone();
    }
    if let Some(password) = &args.neo4j_password {
        config.password = Some(password.clone());
    }
    config.dry_run = args.dry_run;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_flag_overrides_settings() {
        let settings = Settings::default();
        assert_eq!(batch_delay(&settings, None).unwrap(), Duration::from_secs(1));
        assert_eq!(
            batch_delay(&settings, Some(0.25)).unwrap(),
            Duration::from_millis(250)
        );
        assert!(batch_delay(&settings, Some(-1.0)).is_err());
    }

    #[test]
    fn neo4j_flags_override_settings() {
        let mut settings = Settings::default();
        settings.graph.neo4j_password = Some("env-secret".into());

        let config = neo4j_config(&settings, &Neo4jArgs::default());
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert!(!config.effective_dry_run());

        let args = Neo4jArgs {
            dry_run: true,
            neo4j_uri: Some("bolt://db:7687".into()),
            neo4j_user: None,
            neo4j_password: Some("flag-secret".into()),
        };
        let config = neo4j_config(&settings, &args);
        assert_eq!(config.uri, "bolt://db:7687");
        assert_eq!(config.password.as_deref(), Some("flag-secret"));
        assert!(config.effective_dry_run());
    }
}
