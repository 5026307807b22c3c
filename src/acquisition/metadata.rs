//! Metadata extraction from validated project documents.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;

use super::xml::XmlElement;
use crate::models::{ProjectMetadata, METADATA_FIELDS};

/// First non-empty value of each metadata field, looked up by local name in
/// document order, plus file details.
pub fn extract_metadata(root: &XmlElement, path: &Path, content: &[u8]) -> ProjectMetadata {
    let fields: BTreeMap<String, String> = METADATA_FIELDS
        .iter()
        .filter_map(|field| {
            root.first_text(field)
                .map(|value| (field.to_string(), value.to_string()))
        })
        .collect();

    ProjectMetadata {
        fields,
        file_path: path.to_path_buf(),
        file_size: content.len() as u64,
        content_hash: ProjectMetadata::compute_hash(content),
        retrieved_at: Utc::now(),
    }
}
