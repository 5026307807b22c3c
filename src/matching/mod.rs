//! Project resolution: turn a free-text query into one CORDIS project.
//!
//! The resolver searches a handful of query variants, scores every candidate
//! against the original query, merges duplicates and either accepts the best
//! candidate or asks a [`Chooser`] to disambiguate.

mod chooser;
pub mod scoring;
mod variants;

pub use chooser::{
    parse_selection, Chooser, PromptInterrupt, ScriptedChooser, Selection, TerminalChooser,
};
pub use variants::{derive_acronym, expand_acronym, query_variants};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Disambiguation, ResolvedProject, ScoredCandidate};
use crate::search::{SearchError, SearchProvider, SearchSession};

/// Scores above this are accepted without disambiguation and stop the
/// variant loop.
pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.90;

/// Results requested per variant.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Candidates shown when disambiguating.
pub const MAX_PRESENTED: usize = 5;

/// Errors that can occur while resolving a query.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No projects found for query '{query}'")]
    NotFound { query: String },

    #[error("Selection cancelled for query '{query}'")]
    Cancelled { query: String },

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),
}

/// Resolves queries through an injected search provider and chooser.
#[derive(Clone)]
pub struct MatchResolver {
    provider: Arc<dyn SearchProvider>,
    chooser: Arc<dyn Chooser>,
    search_limit: usize,
    accept_threshold: f64,
}

impl MatchResolver {
    pub fn new(provider: Arc<dyn SearchProvider>, chooser: Arc<dyn Chooser>) -> Self {
        Self {
            provider,
            chooser,
            search_limit: DEFAULT_SEARCH_LIMIT,
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn with_accept_threshold(mut self, threshold: f64) -> Self {
        self.accept_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Search every variant (until a confident hit), score, merge by id and
    /// sort by descending score.
    ///
    /// One search session is opened for the call and closed before returning.
    pub async fn candidates(&self, query: &str) -> Result<Vec<ScoredCandidate>, ResolveError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut session = self.provider.open().await?;
        let scored = self.search_variants(session.as_mut(), query).await;
        session.close().await;

        Ok(merge_candidates(scored))
    }

    async fn search_variants(
        &self,
        session: &mut dyn SearchSession,
        query: &str,
    ) -> Vec<ScoredCandidate> {
        let mut all = Vec::new();

        for variant in query_variants(query) {
            debug!("Trying search variant '{}' for '{}'", variant, query);

            let records = match session.search(&variant, self.search_limit).await {
                Ok(records) => records,
                Err(e) => {
                    warn!("Search for variant '{}' of '{}' failed: {}", variant, query, e);
                    Vec::new()
                }
            };

            let mut confident = false;
            for record in records {
                let score = scoring::evaluate(query, &record);
                confident |= score.value > self.accept_threshold;
                all.push(ScoredCandidate {
                    record,
                    score: score.value,
                    match_type: score.match_type,
                    source_variant: variant.clone(),
                });
            }

            if confident {
                debug!("Confident match from variant '{}', stopping", variant);
                break;
            }
        }

        all
    }

    /// Resolve a query to a single project.
    ///
    /// A lone candidate or one scoring above the accept threshold is taken
    /// directly. Otherwise the top candidates go to the chooser when
    /// `interactive`, or the best one is taken as-is.
    pub async fn resolve(
        &self,
        query: &str,
        interactive: bool,
    ) -> Result<ResolvedProject, ResolveError> {
        let mut candidates = self.candidates(query).await?;

        let Some(best) = candidates.first() else {
            info!("No projects found for query '{}'", query);
            return Err(ResolveError::NotFound {
                query: query.to_string(),
            });
        };

        if candidates.len() == 1 || best.score > self.accept_threshold {
            info!(
                "High confidence match for '{}': {} ({:.2})",
                query,
                best.title(),
                best.score
            );
            let best = candidates.swap_remove(0);
            return Ok(ResolvedProject::from_candidate(
                best,
                Disambiguation::Unambiguous,
            ));
        }

        if !interactive {
            info!(
                "Multiple matches for '{}', taking best: {} ({:.2})",
                query,
                best.title(),
                best.score
            );
            let best = candidates.swap_remove(0);
            return Ok(ResolvedProject::from_candidate(best, Disambiguation::Bypassed));
        }

        candidates.truncate(MAX_PRESENTED);
        match self.chooser.present(query, &candidates).await {
            Selection::Pick(index) if index < candidates.len() => {
                let chosen = candidates.swap_remove(index);
                info!("Selected {} for '{}'", chosen.id(), query);
                Ok(ResolvedProject::from_candidate(chosen, Disambiguation::Selected))
            }
            _ => Err(ResolveError::Cancelled {
                query: query.to_string(),
            }),
        }
    }
}

/// Keep one entry per id with its highest score, then sort by descending
/// score. Ties keep first-seen order.
fn merge_candidates(scored: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    let mut merged: Vec<ScoredCandidate> = Vec::with_capacity(scored.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for candidate in scored {
        match positions.get(candidate.id()) {
            Some(&pos) => {
                if candidate.score > merged[pos].score {
                    merged[pos] = candidate;
                }
            }
            None => {
                positions.insert(candidate.id().to_string(), merged.len());
                merged.push(candidate);
            }
        }
    }

    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    merged
}
