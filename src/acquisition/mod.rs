//! Project document acquisition.
//!
//! Downloads a project's XML export, checks its structure before anything
//! touches disk, persists the body verbatim, re-validates the persisted copy
//! and extracts metadata from it.

mod error;
mod metadata;
pub mod validate;
pub mod xml;

pub use error::AcquisitionError;
pub use metadata::extract_metadata;
pub use xml::{XmlDocument, XmlElement, XmlError};

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::http_client::HttpClient;
use crate::models::{ProjectDocument, ProjectMetadata};
use crate::search::CORDIS_BASE_URL;
use crate::storage::{document_storage_path, save_document};

/// Default request timeout for document downloads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A validated, persisted document and its metadata.
#[derive(Debug, Clone)]
pub struct AcquiredProject {
    pub document: ProjectDocument,
    pub metadata: ProjectMetadata,
}

/// Settings for an [`AcquisitionClient`].
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Site root; documents live at `{base_url}/project/id/{id}?format=xml`.
    pub base_url: String,
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl AcquisitionConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: CORDIS_BASE_URL.to_string(),
            output_dir: output_dir.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Downloads and validates project documents. Holds one reusable HTTP
/// session.
pub struct AcquisitionClient {
    client: HttpClient,
    base_url: String,
    output_dir: PathBuf,
}

impl AcquisitionClient {
    pub fn new(config: AcquisitionConfig) -> Result<Self, AcquisitionError> {
        let client = HttpClient::builder("cordis-xml", config.timeout)
            .maybe_user_agent(config.user_agent.as_deref())
            .build()
            .map_err(AcquisitionError::Config)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            output_dir: config.output_dir,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Retrieval URL for a project's XML export.
    pub fn document_url(&self, project_id: &str) -> String {
        format!(
            "{}/project/id/{}?format=xml",
            self.base_url,
            urlencoding::encode(project_id.trim())
        )
    }

    /// Where a project's document is persisted.
    pub fn document_path(&self, project_id: &str) -> PathBuf {
        document_storage_path(&self.output_dir, project_id.trim())
    }

    /// Download, validate, persist and describe one project document.
    pub async fn acquire(&self, project_id: &str) -> Result<AcquiredProject, AcquisitionError> {
        let project_id = project_id.trim();
        let url = self.document_url(project_id);
        debug!("Downloading XML for project {} from {}", project_id, url);

        let response = self
            .client
            .get(&url)
            .await
            .map_err(|e| AcquisitionError::download(project_id, e.to_string()))?;

        if !response.is_success() {
            return Err(AcquisitionError::download(
                project_id,
                format!("HTTP {}", response.status),
            ));
        }

        let mut warnings = Vec::new();
        let content_type = response.content_type().unwrap_or_default().to_string();
        if !content_type.to_lowercase().contains("xml") {
            warnings.push(format!("Content-Type is '{}', expected XML", content_type));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AcquisitionError::download(project_id, e.to_string()))?;

        let text = String::from_utf8_lossy(&body);
        let parsed = XmlDocument::parse(&text)
            .map_err(|e| AcquisitionError::validation(project_id, format!("invalid XML: {}", e)))?;
        validate::check_root(&parsed, project_id)?;

        let path = self.document_path(project_id);
        save_document(&path, &body)
            .await
            .map_err(|e| AcquisitionError::io(project_id, e))?;
        info!("Saved XML for project {} to {}", project_id, path.display());

        let persisted = tokio::fs::read(&path)
            .await
            .map_err(|e| AcquisitionError::io(project_id, e))?;
        let raw_content = String::from_utf8_lossy(&persisted).into_owned();
        let doc = XmlDocument::parse(&raw_content).map_err(|e| {
            AcquisitionError::validation(project_id, format!("persisted copy is invalid: {}", e))
        })?;

        warnings.extend(validate::validate_document(
            &doc,
            persisted.len() as u64,
            project_id,
        )?);
        for warning in &warnings {
            warn!("Project {}: {}", project_id, warning);
        }

        let metadata = extract_metadata(&doc.root, &path, &persisted);
        Ok(AcquiredProject {
            document: ProjectDocument {
                project_id: project_id.to_string(),
                path,
                raw_content,
                validated: true,
                warnings,
            },
            metadata,
        })
    }

    /// Acquire several ids in order, sleeping `delay` between downloads but
    /// not after the last one.
    pub async fn acquire_all(
        &self,
        project_ids: &[String],
        delay: Duration,
    ) -> Vec<(String, Result<AcquiredProject, AcquisitionError>)> {
        let mut results = Vec::with_capacity(project_ids.len());
        for (i, project_id) in project_ids.iter().enumerate() {
            let result = self.acquire(project_id).await;
            if let Err(e) = &result {
                warn!("{}", e);
            }
            results.push((project_id.clone(), result));

            if i + 1 < project_ids.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        results
    }

    /// Lightweight existence probe: a successful response whose body
    /// mentions "project" and the id.
    pub async fn project_exists(&self, project_id: &str) -> bool {
        let project_id = project_id.trim();
        let response = match self.client.get(&self.document_url(project_id)).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                debug!("Project {} probe returned {}", project_id, response.status);
                return false;
            }
            Err(e) => {
                debug!("Project {} probe failed: {}", project_id, e);
                return false;
            }
        };

        match response.text().await {
            Ok(body) => {
                let body = body.to_lowercase();
                body.contains("project") && body.contains(project_id)
            }
            Err(_) => false,
        }
    }
}
