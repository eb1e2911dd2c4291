//! Configuration for the retrieval pipeline.
//!
//! Layered like this, later layers winning:
//! - Default values
//! - `.docent/settings.toml` found by walking up from the working directory
//!   (or an explicit file)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCENT_` and use double
//! underscores to separate nested levels:
//! - `DOCENT_EMBEDDING__RATE_LIMIT_DELAY_MS=250` sets `embedding.rate_limit_delay_ms`
//! - `DOCENT_RETRIEVAL__DEFAULT_K=6` sets `retrieval.default_k`
//! - `DOCENT_INDEX_PATH=/srv/index.dcx` sets `index_path`
//!
//! API keys never live in the settings file. Each remote section names the
//! environment variable that holds its key (`api_key_env`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chunking::{BreakpointScope, ChunkerOptions};
use crate::error::{ErrorContext, RagError, RagResult};
use crate::remote::{ApiScheme, RemoteEndpoint, api_key_from_env};
use crate::vector::{DistanceMetric, IndexOptions};

/// Directory holding settings and the default index.
pub const CONFIG_DIR: &str = ".docent";

/// Settings file name inside [`CONFIG_DIR`].
pub const SETTINGS_FILE: &str = "settings.toml";

const ENV_PREFIX: &str = "DOCENT_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path of the index artifact
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Workspace root directory (where .docent is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// "azure" or "openai"
    #[serde(default)]
    pub provider: ApiScheme,

    /// Base URL; falls back to the variable named by `endpoint_env`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_endpoint_env")]
    pub endpoint_env: String,

    /// Azure API version query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Deployment (Azure) or model name (OpenAI)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected vector length; taken from the first response when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Minimum delay between consecutive embedding calls
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum inputs per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChunkingConfig {
    #[serde(default = "default_breakpoint_percentile")]
    pub breakpoint_percentile: f32,

    /// "document" or "corpus"
    #[serde(default)]
    pub scope: BreakpointScope,

    #[serde(default)]
    pub buffer_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IndexConfig {
    /// "cosine" or "euclidean"
    #[serde(default)]
    pub metric: DistanceMetric,

    /// Entry count at which the index is partitioned with k-means
    #[serde(default = "default_partition_threshold")]
    pub partition_threshold: usize,

    #[serde(default = "default_max_partitions")]
    pub max_partitions: usize,

    /// Partitions scored per query
    #[serde(default = "default_probe_clusters")]
    pub probe_clusters: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Requested k is clamped to this
    #[serde(default = "default_max_k")]
    pub max_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IngestConfig {
    /// Directory ingested when none is given on the command line
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Supported extensions, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Walk subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Load documents on the rayon pool
    #[serde(default = "default_true")]
    pub parallel: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: ApiScheme,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_endpoint_env")]
    pub endpoint_env: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// HTTP server bind address
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("index.dcx")
}
fn default_true() -> bool {
    true
}
fn default_endpoint_env() -> String {
    "AZURE_OPENAI_ENDPOINT".to_string()
}
fn default_api_version() -> String {
    "2024-02-15-preview".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_rate_limit_delay_ms() -> u64 {
    500
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_batch_size() -> usize {
    64
}
fn default_api_key_env() -> String {
    "AZURE_OPENAI_API_KEY".to_string()
}
fn default_breakpoint_percentile() -> f32 {
    95.0
}
fn default_partition_threshold() -> usize {
    10_000
}
fn default_max_partitions() -> usize {
    100
}
fn default_probe_clusters() -> usize {
    4
}
fn default_k() -> usize {
    4
}
fn default_max_k() -> usize {
    20
}
fn default_source_dir() -> PathBuf {
    PathBuf::from("data/docs")
}
fn default_extensions() -> Vec<String> {
    ["pdf", "txt", "md", "rst"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    60
}
fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            workspace_root: None,
            debug: false,
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            ingest: IngestConfig::default(),
            generation: GenerationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ApiScheme::Azure,
            endpoint: None,
            endpoint_env: default_endpoint_env(),
            api_version: default_api_version(),
            model: default_embedding_model(),
            dimension: None,
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            timeout_secs: default_embedding_timeout_secs(),
            batch_size: default_batch_size(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            breakpoint_percentile: default_breakpoint_percentile(),
            scope: BreakpointScope::Document,
            buffer_size: 0,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            partition_threshold: default_partition_threshold(),
            max_partitions: default_max_partitions(),
            probe_clusters: default_probe_clusters(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            max_k: default_max_k(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            extensions: default_extensions(),
            recursive: false,
            parallel: true,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ApiScheme::Azure,
            endpoint: None,
            endpoint_env: default_endpoint_env(),
            api_version: default_api_version(),
            model: default_chat_model(),
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: default_generation_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolves endpoint and key from settings and environment.
    pub fn remote_endpoint(&self) -> RagResult<RemoteEndpoint> {
        Ok(RemoteEndpoint {
            scheme: self.provider,
            base_url: resolve_endpoint(self.provider, self.endpoint.as_deref(), &self.endpoint_env)?,
            model: self.model.clone(),
            api_version: self.api_version.clone(),
            api_key: api_key_from_env(&self.api_key_env)?,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

impl GenerationConfig {
    pub fn remote_endpoint(&self) -> RagResult<RemoteEndpoint> {
        Ok(RemoteEndpoint {
            scheme: self.provider,
            base_url: resolve_endpoint(self.provider, self.endpoint.as_deref(), &self.endpoint_env)?,
            model: self.model.clone(),
            api_version: self.api_version.clone(),
            api_key: api_key_from_env(&self.api_key_env)?,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

fn resolve_endpoint(scheme: ApiScheme, configured: Option<&str>, env: &str) -> RagResult<String> {
    if let Some(endpoint) = configured.filter(|e| !e.trim().is_empty()) {
        return Ok(endpoint.to_string());
    }
    if let Ok(endpoint) = std::env::var(env) {
        if !endpoint.trim().is_empty() {
            return Ok(endpoint);
        }
    }
    match scheme {
        ApiScheme::OpenAi => Ok("https://api.openai.com/v1".to_string()),
        ApiScheme::Azure => Err(RagError::config(format!(
            "no endpoint configured: set 'endpoint' in settings.toml or the {env} environment variable"
        ))),
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> RagResult<Self> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(|e| RagError::config(e.to_string()))
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
            .and_then(Settings::validated)
    }

    /// Load configuration from a specific file
    ///
    /// A file inside a `.docent` directory makes that directory's parent the
    /// workspace root, so relative paths resolve there.
    pub fn load_from(path: impl AsRef<Path>) -> RagResult<Self> {
        let path = path.as_ref();
        Self::figment(path)
            .extract()
            .map_err(|e| RagError::config(e.to_string()))
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root_of(path);
                }
                settings
            })
            .and_then(Settings::validated)
    }

    /// Parent of the `.docent` directory holding `config_path`, if any.
    fn workspace_root_of(config_path: &Path) -> Option<PathBuf> {
        let config_dir = config_path.parent()?;
        if config_dir.file_name()? != CONFIG_DIR {
            return None;
        }
        let root = config_dir.parent()?;
        if root.as_os_str().is_empty() {
            std::env::current_dir().ok()
        } else {
            Some(root.to_path_buf())
        }
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels; single underscores stay in names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validated(self) -> RagResult<Self> {
        let p = self.chunking.breakpoint_percentile;
        if !(0.0..=100.0).contains(&p) {
            return Err(RagError::config(format!(
                "chunking.breakpoint_percentile must be within [0, 100], got {p}"
            )));
        }
        if self.retrieval.default_k == 0 {
            return Err(RagError::config("retrieval.default_k must be at least 1"));
        }
        if self.retrieval.max_k < self.retrieval.default_k {
            return Err(RagError::config(format!(
                "retrieval.max_k ({}) must not be smaller than retrieval.default_k ({})",
                self.retrieval.max_k, self.retrieval.default_k
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(RagError::config("embedding.batch_size must be at least 1"));
        }
        if self.embedding.dimension == Some(0) {
            return Err(RagError::config("embedding.dimension must be positive"));
        }
        if self.ingest.extensions.is_empty() {
            return Err(RagError::config("ingest.extensions must not be empty"));
        }
        Ok(self)
    }

    /// Find the settings file by looking for a .docent directory from the
    /// current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(SETTINGS_FILE))
    }

    /// Get the workspace root directory (where .docent is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Index path, resolved against the workspace root when relative.
    pub fn resolved_index_path(&self) -> PathBuf {
        match &self.workspace_root {
            Some(root) if self.index_path.is_relative() => root.join(&self.index_path),
            _ => self.index_path.clone(),
        }
    }

    pub fn chunker_options(&self) -> ChunkerOptions {
        ChunkerOptions {
            breakpoint_percentile: self.chunking.breakpoint_percentile,
            scope: self.chunking.scope,
            buffer_size: self.chunking.buffer_size,
            batch_size: self.embedding.batch_size,
        }
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            metric: self.index.metric,
            model: self.embedding.model.clone(),
            partition_threshold: self.index.partition_threshold,
            max_partitions: self.index.max_partitions,
            probe_clusters: self.index.probe_clusters,
        }
    }

    /// Effective settings rendered as TOML
    pub fn to_toml(&self) -> RagResult<String> {
        toml::to_string_pretty(self).map_err(|e| RagError::config(e.to_string()))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> RagResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
        std::fs::write(path, self.to_toml()?).with_path(path)
    }

    /// Create a settings file with helpful comments under `dir`/.docent
    pub fn init_config_file(dir: &Path, force: bool) -> RagResult<PathBuf> {
        let config_path = dir.join(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err(RagError::config(format!(
                "configuration file already exists at {}. Use --force to overwrite",
                config_path.display()
            )));
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }

        std::fs::write(&config_path, SETTINGS_TEMPLATE).with_path(&config_path)?;
        Ok(config_path)
    }
}

const SETTINGS_TEMPLATE: &str = r#"# Docent Configuration File
#
# Every value can be overridden from the environment with the DOCENT_ prefix,
# using __ between levels: DOCENT_EMBEDDING__RATE_LIMIT_DELAY_MS=250

# Version of the configuration schema
version = 1

# Index artifact (relative paths resolve against the workspace root)
index_path = ".docent/index.dcx"

# Global debug mode
debug = false

[embedding]
# "azure" (deployment URL, api-key header) or "openai" (Bearer token)
provider = "azure"

# Base URL of the resource; when unset, read from the variable named below
# endpoint = "https://my-resource.openai.azure.com"
endpoint_env = "AZURE_OPENAI_ENDPOINT"
api_version = "2024-02-15-preview"

# Deployment name (azure) or model name (openai)
model = "text-embedding-ada-002"

# Expected vector length; detected from the first response when unset
# dimension = 1536

# Minimum delay between consecutive embedding calls, in milliseconds
rate_limit_delay_ms = 500
timeout_secs = 30

# Maximum inputs per embedding request
batch_size = 64

# Environment variable holding the API key (keys are never stored here)
api_key_env = "AZURE_OPENAI_API_KEY"

[chunking]
# Consecutive-sentence distances at or above this percentile start a new chunk
breakpoint_percentile = 95.0

# "document": one threshold per document; "corpus": one threshold per run
scope = "document"

# Neighbouring sentences embedded together with each sentence
buffer_size = 0

[index]
# "cosine" or "euclidean"; fixed when the index is built
metric = "cosine"

# Indexes with at least this many chunks are partitioned with k-means
partition_threshold = 10000
max_partitions = 100

# Partitions scored per query
probe_clusters = 4

[retrieval]
default_k = 4
max_k = 20

[ingest]
source_dir = "data/docs"
extensions = ["pdf", "txt", "md", "rst"]
recursive = false
parallel = true

[generation]
provider = "azure"
# endpoint = "https://my-resource.openai.azure.com"
endpoint_env = "AZURE_OPENAI_ENDPOINT"
api_version = "2024-02-15-preview"
model = "gpt-4o-mini"
temperature = 0.0
# max_tokens = 800
timeout_secs = 60
api_key_env = "AZURE_OPENAI_API_KEY"

[server]
bind = "127.0.0.1:8000"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.index_path, PathBuf::from(".docent/index.dcx"));
        assert_eq!(settings.embedding.rate_limit_delay_ms, 500);
        assert_eq!(settings.chunking.breakpoint_percentile, 95.0);
        assert_eq!(settings.retrieval.default_k, 4);
        assert_eq!(settings.ingest.extensions, vec!["pdf", "txt", "md", "rst"]);
        assert_eq!(settings.generation.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
index_path = "/srv/docent/index.dcx"

[embedding]
provider = "openai"
model = "text-embedding-3-small"
dimension = 512

[chunking]
scope = "corpus"

[index]
metric = "euclidean"
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.index_path, PathBuf::from("/srv/docent/index.dcx"));
        assert_eq!(settings.embedding.provider, ApiScheme::OpenAi);
        assert_eq!(settings.embedding.dimension, Some(512));
        assert_eq!(settings.chunking.scope, BreakpointScope::Corpus);
        assert_eq!(settings.index.metric, DistanceMetric::Euclidean);
        // Untouched sections keep defaults
        assert_eq!(settings.retrieval.max_k, 20);
        assert_eq!(settings.embedding.batch_size, 64);
    }

    #[test]
    fn test_load_from_workspace_config_resolves_against_workspace() {
        let temp_dir = TempDir::new().unwrap();
        let workspace = temp_dir.path().join("other");
        let config_path = workspace.join(CONFIG_DIR).join(SETTINGS_FILE);
        fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        fs::write(&config_path, "[ingest]\nsource_dir = \"docs\"\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.workspace_root.as_deref(), Some(workspace.as_path()));
        assert_eq!(
            settings.resolved_index_path(),
            workspace.join(".docent").join("index.dcx")
        );

        // A loose settings file has no workspace
        let loose = temp_dir.path().join("settings.toml");
        fs::write(&loose, "").unwrap();
        assert!(Settings::load_from(&loose).unwrap().workspace_root.is_none());
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let settings: Settings = toml::from_str(SETTINGS_TEMPLATE).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.retrieval.default_k = 7;
        settings.embedding.dimension = Some(1536);

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.retrieval.default_k, 7);
        assert_eq!(loaded.embedding.dimension, Some(1536));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(&config_path, "[chunking]\nbreakpoint_percentile = 140.0\n").unwrap();
        assert!(Settings::load_from(&config_path).is_err());

        fs::write(&config_path, "[retrieval]\ndefault_k = 10\nmax_k = 5\n").unwrap();
        let err = Settings::load_from(&config_path).unwrap_err();
        assert_eq!(err.status_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[ingest]\nrecursive = false\nsource_dir = \"corpus\"\n").unwrap();

        // Unique key so parallel tests are unaffected
        unsafe {
            std::env::set_var("DOCENT_INGEST__RECURSIVE", "true");
        }
        let settings = Settings::load_from(&config_path).unwrap();
        unsafe {
            std::env::remove_var("DOCENT_INGEST__RECURSIVE");
        }

        assert!(settings.ingest.recursive);
        assert_eq!(settings.ingest.source_dir, PathBuf::from("corpus"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = Settings::init_config_file(temp_dir.path(), false).unwrap();
        assert!(path.ends_with(".docent/settings.toml"));

        assert!(Settings::init_config_file(temp_dir.path(), false).is_err());
        assert!(Settings::init_config_file(temp_dir.path(), true).is_ok());
    }

    #[test]
    fn test_resolve_endpoint() {
        assert_eq!(
            resolve_endpoint(ApiScheme::Azure, Some("https://x.test"), "UNSET_DOCENT_VAR").unwrap(),
            "https://x.test"
        );
        assert_eq!(
            resolve_endpoint(ApiScheme::OpenAi, None, "UNSET_DOCENT_VAR").unwrap(),
            "https://api.openai.com/v1"
        );
        assert!(resolve_endpoint(ApiScheme::Azure, None, "UNSET_DOCENT_VAR").is_err());
    }

    #[test]
    fn test_resolved_index_path_uses_workspace_root() {
        let settings = Settings {
            workspace_root: Some(PathBuf::from("/work")),
            ..Settings::default()
        };
        assert_eq!(
            settings.resolved_index_path(),
            PathBuf::from("/work/.docent/index.dcx")
        );
    }
}
