//! Search candidates and resolution results.

use serde::{Deserialize, Serialize};

/// A single project returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// CORDIS project id (numeric string).
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
}

impl CandidateRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            url: url.into(),
        }
    }
}

/// The strongest matching signal that fired while scoring a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ExactTitle,
    Acronym,
    Fuzzy,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactTitle => "exact_title",
            Self::Acronym => "acronym",
            Self::Fuzzy => "fuzzy",
        }
    }
}

/// A candidate scored against the original query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub record: CandidateRecord,
    /// Match score in `[0, 1]`.
    pub score: f64,
    pub match_type: MatchType,
    /// Query variant whose search produced this candidate.
    pub source_variant: String,
}

impl ScoredCandidate {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }
}

/// How a resolution settled on its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disambiguation {
    /// Single candidate, or the top score cleared the auto-accept threshold.
    Unambiguous,
    /// Picked interactively from several candidates.
    Selected,
    /// Several candidates remained but the run was non-interactive, so the
    /// top-scored one was taken.
    Bypassed,
}

/// The accepted candidate for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProject {
    pub id: String,
    pub title: String,
    pub url: String,
    pub score: f64,
    pub variant: String,
    pub disambiguation: Disambiguation,
}

impl ResolvedProject {
    pub fn from_candidate(candidate: ScoredCandidate, disambiguation: Disambiguation) -> Self {
        Self {
            id: candidate.record.id,
            title: candidate.record.title,
            url: candidate.record.url,
            score: candidate.score,
            variant: candidate.source_variant,
            disambiguation,
        }
    }
}
