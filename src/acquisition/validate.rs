//! Structural checks on project documents.

use super::error::AcquisitionError;
use super::xml::XmlDocument;

/// Local name every project document root must carry.
pub const EXPECTED_ROOT: &str = "project";

/// Namespace CORDIS declares on project documents.
pub const CORDIS_NAMESPACE: &str = "http://cordis.europa.eu";

/// Fields whose absence is worth a warning.
pub const ESSENTIAL_FIELDS: &[&str] = &["title", "startDate", "totalCost"];

/// Smaller documents are error pages or stubs.
pub const MIN_DOCUMENT_SIZE: u64 = 1000;

/// Larger documents are suspicious but kept.
pub const MAX_DOCUMENT_SIZE: u64 = 10 * 1024 * 1024;

/// Root element must be `project`; returns a warning when the root carries
/// a namespace other than the CORDIS one.
pub fn check_root(doc: &XmlDocument, project_id: &str) -> Result<Option<String>, AcquisitionError> {
    let root = &doc.root;
    if root.local_name != EXPECTED_ROOT {
        return Err(AcquisitionError::validation(
            project_id,
            format!(
                "root element is '{}', expected '{}'",
                root.local_name, EXPECTED_ROOT
            ),
        ));
    }

    Ok(match root.namespace.as_deref() {
        Some(ns) if ns != CORDIS_NAMESPACE => Some(format!(
            "namespace is '{}', expected '{}'",
            ns, CORDIS_NAMESPACE
        )),
        _ => None,
    })
}

/// Full validation of a persisted document of `size` bytes. Returns the
/// non-fatal warnings.
pub fn validate_document(
    doc: &XmlDocument,
    size: u64,
    project_id: &str,
) -> Result<Vec<String>, AcquisitionError> {
    let mut warnings: Vec<String> = check_root(doc, project_id)?.into_iter().collect();

    match doc.root.find_first("id") {
        Some(id) => {
            let found = id.trimmed_text();
            if found != project_id.trim() {
                return Err(AcquisitionError::validation(
                    project_id,
                    format!(
                        "document project id '{}' does not match requested '{}'",
                        found, project_id
                    ),
                ));
            }
        }
        None => warnings.push("no project id found in document".to_string()),
    }

    let missing: Vec<&str> = ESSENTIAL_FIELDS
        .iter()
        .copied()
        .filter(|field| doc.root.first_text(field).is_none())
        .collect();
    if !missing.is_empty() {
        warnings.push(format!(
            "missing or empty essential fields: {}",
            missing.join(", ")
        ));
    }

    if size < MIN_DOCUMENT_SIZE {
        return Err(AcquisitionError::SizeAnomaly {
            project_id: project_id.to_string(),
            size,
        });
    }
    if size > MAX_DOCUMENT_SIZE {
        warnings.push(format!("document is very large ({} bytes)", size));
    }

    Ok(warnings)
}
