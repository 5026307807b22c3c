//! Acquired project documents and their extracted metadata.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fields pulled out of a project document, in lookup order.
pub const METADATA_FIELDS: &[&str] = &[
    "id",
    "acronym",
    "title",
    "objective",
    "startDate",
    "endDate",
    "totalCost",
    "ecMaxContribution",
    "keywords",
];

/// A project XML document that passed structural validation and was written
/// to disk.
#[derive(Debug, Clone)]
pub struct ProjectDocument {
    pub project_id: String,
    /// Where the verbatim body was persisted.
    pub path: PathBuf,
    pub raw_content: String,
    pub validated: bool,
    /// Non-fatal findings from validation (missing essential fields, large
    /// file, unexpected namespace, ...).
    pub warnings: Vec<String>,
}

impl ProjectDocument {
    pub fn size(&self) -> u64 {
        self.raw_content.len() as u64
    }
}

/// Metadata extracted from a persisted project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Extracted values keyed by element local name (see [`METADATA_FIELDS`]).
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    pub file_path: PathBuf,
    pub file_size: u64,
    /// SHA-256 of the persisted bytes.
    pub content_hash: String,
    pub retrieved_at: DateTime<Utc>,
}

impl ProjectMetadata {
    /// Compute SHA-256 hash of content.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|s| s.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn acronym(&self) -> Option<&str> {
        self.get("acronym")
    }
}
