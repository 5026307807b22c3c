//! Storage helpers for project documents and batch records on disk.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Keep file names to a safe character set.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Construct the storage path for a project document:
/// `{output_dir}/cordis_project_{id}.xml`
pub fn document_storage_path(output_dir: &Path, project_id: &str) -> PathBuf {
    output_dir.join(format!("cordis_project_{}.xml", sanitize_filename(project_id)))
}

/// Construct the path of a batch metadata record:
/// `{output_dir}/{batch_name}_metadata.json`
pub fn batch_metadata_path(output_dir: &Path, batch_name: &str) -> PathBuf {
    output_dir.join(format!("{}_metadata.json", sanitize_filename(batch_name)))
}

/// Write content verbatim, creating parent directories and replacing any
/// existing file.
pub async fn save_document(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await
}

/// Serialize a value as pretty JSON to `path`.
pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    save_document(path, json.as_bytes()).await?;
    Ok(())
}
