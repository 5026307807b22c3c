//! Data models for cordisacquire.

mod batch;
mod candidate;
mod project;

pub use batch::{BatchResult, BatchStatistics, FailureKind, ProjectRecord, QueryFailure};
pub use candidate::{
    CandidateRecord, Disambiguation, MatchType, ResolvedProject, ScoredCandidate,
};
pub use project::{ProjectDocument, ProjectMetadata, METADATA_FIELDS};
