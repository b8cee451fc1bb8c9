//! # Application Configuration
//!
//! `scholargraph.toml`, then environment overrides, then command-line flags.
//!
//! ```toml
//! [database]
//! path = "scholargraph.redb"
//!
//! [openalex]
//! email = "me@example.org"
//!
//! [embedding]
//! url = "http://localhost:8000/v1"
//! model = "all-MiniLM-L6-v2"
//! dimension = 384
//!
//! [import]
//! batch_size = 500
//!
//! [search]
//! rrf_k = 60.0
//! ```
//!
//! Every field has a default, so an absent file is a valid configuration.

use scholargraph_core::primitives::DEFAULT_EMBEDDING_DIMENSION;
use scholargraph_core::{ImportConfig, ScholarError, SearchConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "scholargraph.toml";

pub const ENV_DATABASE: &str = "SCHOLARGRAPH_DB";
pub const ENV_OPENALEX_EMAIL: &str = "OPENALEX_EMAIL";
pub const ENV_EMBEDDING_URL: &str = "SCHOLARGRAPH_EMBEDDING_URL";
pub const ENV_EMBEDDING_API_KEY: &str = "SCHOLARGRAPH_EMBEDDING_API_KEY";

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("scholargraph.redb"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    pub base_url: String,
    /// Contact address for the polite pool.
    pub email: Option<String>,
    /// Minimum spacing between two requests.
    pub min_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Raw records kept in memory for the lifetime of one client; 0 disables
    /// the cache.
    pub cache_capacity: usize,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openalex.org".to_string(),
            email: None,
            min_delay_ms: 100,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            cache_capacity: 10_000,
        }
    }
}

/// An OpenAI-compatible `/embeddings` endpoint. Embeddings are available
/// only when `url` is set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    /// Texts per HTTP request.
    pub batch_size: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            batch_size: 32,
            timeout_secs: 30,
        }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub openalex: OpenAlexConfig,
    pub embedding: EmbeddingConfig,
    pub import: ImportConfig,
    pub search: SearchConfig,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ScholarError> {
        toml::from_str(contents).map_err(|e| ScholarError::Config(e.to_string()))
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_FILE`] if it exists, else
    /// defaults; then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ScholarError> {
        let mut config = match path {
            Some(p) => Self::read_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::read_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ScholarError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ScholarError::Io(format!("cannot read {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml(&contents)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(path) = get(ENV_DATABASE) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(email) = get(ENV_OPENALEX_EMAIL) {
            self.openalex.email = Some(email);
        }
        if let Some(url) = get(ENV_EMBEDDING_URL) {
            self.embedding.url = Some(url);
        }
        if let Some(key) = get(ENV_EMBEDDING_API_KEY) {
            self.embedding.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ScholarError> {
        self.import.validate()?;
        self.search
            .validate()
            .map_err(|e| ScholarError::Config(format!("[search] {e}")))?;
        if self.embedding.dimension == 0 {
            return Err(ScholarError::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ScholarError::Config(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.openalex.base_url.trim().is_empty() {
            return Err(ScholarError::Config(
                "openalex.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether an embedding endpoint is configured.
    pub fn embeddings_available(&self) -> bool {
        self.embedding.url.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = AppConfig::from_toml("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert!(!config.embeddings_available());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sections_parse() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            path = "/tmp/graph.redb"

            [openalex]
            email = "me@example.org"
            min_delay_ms = 250

            [embedding]
            url = "http://localhost:8000/v1"
            dimension = 768

            [import]
            batch_size = 100
            max_depth = 2

            [import.source_retry]
            max_attempts = 5

            [search]
            rrf_k = 30.0
            vector_weight = 0.7
            "#,
        )
        .expect("parse");

        assert_eq!(config.database.path, PathBuf::from("/tmp/graph.redb"));
        assert_eq!(config.openalex.email.as_deref(), Some("me@example.org"));
        assert_eq!(config.openalex.min_delay_ms, 250);
        assert_eq!(config.openalex.request_timeout_secs, 30);
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
        assert_eq!(config.import.batch_size, 100);
        assert_eq!(config.import.max_depth, 2);
        assert_eq!(config.import.source_retry.max_attempts, 5);
        assert_eq!(config.import.store_retry.max_attempts, 3);
        assert_eq!(config.search.rrf_k, 30.0);
        assert_eq!(config.search.vector_weight, 0.7);
        assert_eq!(config.search.fulltext_weight, 0.5);
        assert!(config.embeddings_available());
    }

    #[test]
    fn malformed_document_is_config_error() {
        let err = AppConfig::from_toml("[import]\nbatch_size = \"many\"").unwrap_err();
        assert!(matches!(err, ScholarError::Config(_)));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = AppConfig::from_toml("[openalex]\nemail = \"file@example.org\"").unwrap();
        let env: BTreeMap<&str, &str> = BTreeMap::from([
            (ENV_OPENALEX_EMAIL, "env@example.org"),
            (ENV_DATABASE, "/data/env.redb"),
            (ENV_EMBEDDING_API_KEY, "  "),
        ]);
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.openalex.email.as_deref(), Some("env@example.org"));
        assert_eq!(config.database.path, PathBuf::from("/data/env.redb"));
        assert_eq!(config.embedding.api_key, None);
    }

    #[test]
    fn invalid_values_rejected() {
        let zero_batch = AppConfig::from_toml("[import]\nbatch_size = 0").unwrap();
        assert!(zero_batch.validate().is_err());
        let bad_k = AppConfig::from_toml("[search]\nrrf_k = 0.0").unwrap();
        assert!(matches!(bad_k.validate(), Err(ScholarError::Config(_))));
        let no_dim = AppConfig::from_toml("[embedding]\ndimension = 0").unwrap();
        assert!(no_dim.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_io_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/scholargraph.toml"))).unwrap_err();
        assert!(matches!(err, ScholarError::Io(_)));
    }
}
