//! Project search providers.
//!
//! A provider hands out scoped sessions; a session answers free-text queries
//! with an ordered list of candidate projects and must be closed when the
//! caller is done with it.

mod cordis;

pub use cordis::{parse_results, CordisSearchProvider, CORDIS_BASE_URL};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::CandidateRecord;

/// Errors that can occur during a search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse search results: {0}")]
    Parse(String),

    #[error("Search provider unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Source of candidate projects for a free-text query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Open a search session. The caller must `close()` it on every path.
    async fn open(&self) -> Result<Box<dyn SearchSession>, SearchError>;
}

/// A scoped search session.
#[async_trait]
pub trait SearchSession: Send {
    /// Search for projects; results are in provider relevance order and
    /// hold at most `limit` entries. An empty list is a valid answer.
    async fn search(
        &mut self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CandidateRecord>, SearchError>;

    /// Release session resources. Calling it more than once is harmless.
    async fn close(&mut self);
}
