//! Configuration management for cordisacquire using the prefer crate.
//!
//! `Config` mirrors the configuration file (every field optional);
//! `Settings` holds the resolved values the rest of the crate runs with.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionConfig;
use crate::graph::{
    default_python, discover_raxkg_root, GraphConfig, Neo4jConfig, DEFAULT_NEO4J_URI,
    DEFAULT_NEO4J_USER,
};
use crate::matching::{DEFAULT_ACCEPT_THRESHOLD, DEFAULT_SEARCH_LIMIT};
use crate::search::{CordisSearchProvider, CORDIS_BASE_URL};

/// Name used for config file discovery.
pub const CONFIG_NAME: &str = "cordisacquire";

/// Downstream graph settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSettings {
    pub raxkg_root: Option<PathBuf>,
    pub schema_path: Option<PathBuf>,
    pub graph_db_root: Option<PathBuf>,
    /// Interpreter; discovered on PATH when unset.
    pub python: Option<PathBuf>,
    /// Build step timeout in seconds.
    pub build_timeout: u64,
    /// Import step timeout in seconds.
    pub import_timeout: u64,
    pub neo4j_uri: String,
    pub neo4j_user: String,
    /// Only ever taken from the environment.
    pub neo4j_password: Option<String>,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            raxkg_root: None,
            schema_path: None,
            graph_db_root: None,
            python: None,
            build_timeout: 300,
            import_timeout: 600,
            neo4j_uri: DEFAULT_NEO4J_URI.to_string(),
            neo4j_user: DEFAULT_NEO4J_USER.to_string(),
            neo4j_password: None,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Where documents and batch records are written.
    pub output_dir: PathBuf,
    /// User agent; `None` uses the built-in browser-like one, `"impersonate"`
    /// picks a real browser string.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Delay between batch queries in milliseconds.
    pub batch_delay_ms: u64,
    pub search_base_url: String,
    pub document_base_url: String,
    /// Results requested per search variant.
    pub search_limit: usize,
    /// Scores above this are accepted without disambiguation.
    pub accept_threshold: f64,
    pub graph: GraphSettings,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/cordis/
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let output_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cordis");

        Self {
            output_dir,
            user_agent: None,
            request_timeout: 30,
            batch_delay_ms: 1000,
            search_base_url: CORDIS_BASE_URL.to_string(),
            document_base_url: CORDIS_BASE_URL.to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            graph: GraphSettings::default(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Ensure the output directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create output directory '{}': {}",
                    self.output_dir.display(),
                    e
                ),
            )
        })
    }

    pub fn search_provider(&self) -> CordisSearchProvider {
        CordisSearchProvider::new(&self.search_base_url)
            .with_timeout(self.request_timeout())
            .with_user_agent(self.user_agent.clone())
    }

    /// Acquisition settings writing into `output_dir`.
    pub fn acquisition_config(&self, output_dir: &Path) -> AcquisitionConfig {
        AcquisitionConfig::new(output_dir)
            .with_base_url(&self.document_base_url)
            .with_timeout(self.request_timeout())
            .with_user_agent(self.user_agent.clone())
    }

    /// Graph settings. Without a configured RAXKG root, a checkout beside
    /// the working directory or under the home directory is used.
    pub fn graph_config(&self) -> Result<GraphConfig, String> {
        let root = self
            .graph
            .raxkg_root
            .clone()
            .or_else(|| {
                let cwd = std::env::current_dir().ok()?;
                discover_raxkg_root(&cwd, dirs::home_dir().as_deref())
            })
            .ok_or_else(|| {
                "RAXKG root is not configured and no checkout was found nearby \
                 (set RAXKG_ROOT or graph.raxkg_root)"
                    .to_string()
            })?;

        let mut config = GraphConfig::for_root(root);
        if let Some(schema) = &self.graph.schema_path {
            config.schema_path = schema.clone();
        }
        if let Some(graph_db) = &self.graph.graph_db_root {
            config.graph_db_root = graph_db.clone();
        }
        config.python = self.graph.python.clone().unwrap_or_else(default_python);
        config.build_timeout = Duration::from_secs(self.graph.build_timeout);
        config.import_timeout = Duration::from_secs(self.graph.import_timeout);

        if !config.raxkg_root.exists() {
            tracing::warn!("RAXKG root not found: {}", config.raxkg_root.display());
        }
        if !config.schema_path.exists() {
            tracing::warn!("Schema file not found: {}", config.schema_path.display());
        }
        Ok(config)
    }

    /// Neo4j settings with the configured defaults.
    pub fn neo4j_config(&self) -> Neo4jConfig {
        Neo4jConfig {
            uri: self.graph.neo4j_uri.clone(),
            user: self.graph.neo4j_user.clone(),
            password: self.graph.neo4j_password.clone(),
            dry_run: false,
        }
    }

    /// Apply environment overrides. `lookup` is usually `std::env::var`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F, base_dir: &Path)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(dir) = get("CORDIS_OUTPUT_DIR") {
            tracing::debug!("Using CORDIS_OUTPUT_DIR from environment: {}", dir);
            self.output_dir = resolve_path(&dir, base_dir);
        }
        if let Some(url) = get("CORDIS_BASE_URL") {
            tracing::debug!("Using CORDIS_BASE_URL from environment: {}", url);
            self.document_base_url = url;
        }
        if let Some(url) = get("CORDIS_SEARCH_URL") {
            tracing::debug!("Using CORDIS_SEARCH_URL from environment: {}", url);
            self.search_base_url = url;
        }
        if let Some(root) = get("RAXKG_ROOT") {
            tracing::debug!("Using RAXKG_ROOT from environment: {}", root);
            self.graph.raxkg_root = Some(resolve_path(&root, base_dir));
        }
        if let Some(password) = get("NEO4J_PASSWORD") {
            self.graph.neo4j_password = Some(password);
        }
    }
}

/// Graph section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raxkg_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_db_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neo4j_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neo4j_user: Option<String>,
}

impl GraphFileConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Output directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub output_dir: Option<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Delay between batch queries in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "GraphFileConfig::is_default")]
    pub graph: GraphFileConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// Resolve a path that may be relative.
/// - Absolute paths are returned as-is
/// - Paths starting with ~ are expanded
/// - Relative paths are resolved relative to `base_dir`
pub fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(path_str);
    let path = Path::new(expanded.as_ref());

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers cordisacquire config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref dir) = self.output_dir {
            settings.output_dir = resolve_path(dir, base_dir);
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(delay) = self.batch_delay_ms {
            settings.batch_delay_ms = delay;
        }
        if let Some(ref url) = self.search_base_url {
            settings.search_base_url = url.clone();
        }
        if let Some(ref url) = self.document_base_url {
            settings.document_base_url = url.clone();
        }
        if let Some(limit) = self.search_limit {
            settings.search_limit = limit.max(1);
        }
        if let Some(threshold) = self.accept_threshold {
            settings.accept_threshold = threshold.clamp(0.0, 1.0);
        }

        let graph = &self.graph;
        if let Some(ref root) = graph.raxkg_root {
            settings.graph.raxkg_root = Some(resolve_path(root, base_dir));
        }
        if let Some(ref schema) = graph.schema_path {
            settings.graph.schema_path = Some(resolve_path(schema, base_dir));
        }
        if let Some(ref graph_db) = graph.graph_db_root {
            settings.graph.graph_db_root = Some(resolve_path(graph_db, base_dir));
        }
        if let Some(ref python) = graph.python {
            settings.graph.python = Some(PathBuf::from(shellexpand::tilde(python).as_ref()));
        }
        if let Some(timeout) = graph.build_timeout {
            settings.graph.build_timeout = timeout;
        }
        if let Some(timeout) = graph.import_timeout {
            settings.graph.import_timeout = timeout;
        }
        if let Some(ref uri) = graph.neo4j_uri {
            settings.graph.neo4j_uri = uri.clone();
        }
        if let Some(ref user) = graph.neo4j_user {
            settings.graph.neo4j_user = user.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Output directory (--output flag); wins over config and environment.
    pub output_dir: Option<PathBuf>,
}

/// Load settings with explicit options.
/// Precedence, lowest first: defaults, config file, environment, flags.
pub async fn load_settings_with_options(options: LoadOptions) -> Result<(Settings, Config), String> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd.clone()
    } else {
        config.base_dir().unwrap_or_else(|| cwd.clone())
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env_overrides(|key| std::env::var(key).ok(), &cwd);

    if let Some(dir) = options.output_dir {
        settings.output_dir = if dir.is_absolute() { dir } else { cwd.join(dir) };
    }

    Ok((settings, config))
}
