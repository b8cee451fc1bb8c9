//! # Pipeline Configuration
//!
//! Tunables for the import and retrieval pipelines. Both structs deserialize
//! from the `[import]` and `[search]` tables of the application's TOML file;
//! every field has a default.

use crate::primitives::{
    DEFAULT_BATCH_SIZE, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_OVERFETCH, DEFAULT_PATH_WEIGHT,
    DEFAULT_RRF_K,
};
use crate::retry::RetryPolicy;
use crate::types::ScholarError;
use serde::{Deserialize, Serialize};

// =============================================================================
// IMPORT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Records per persistence batch.
    pub batch_size: usize,
    /// Deepest frontier level whose items may still enqueue cited works.
    pub max_depth: u32,
    pub skip_abstracts: bool,
    pub generate_embeddings: bool,
    /// Policy for RecordSource calls.
    pub source_retry: RetryPolicy,
    /// Policy for GraphStore batch writes.
    pub store_retry: RetryPolicy,
    /// Policy for embedding calls.
    pub embedding_retry: RetryPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_depth: 0,
            skip_abstracts: false,
            generate_embeddings: false,
            source_retry: RetryPolicy::default(),
            store_retry: RetryPolicy::default(),
            embedding_retry: RetryPolicy::default(),
        }
    }
}

impl ImportConfig {
    pub fn validate(&self) -> Result<(), ScholarError> {
        if self.batch_size == 0 {
            return Err(ScholarError::Config(
                "import.batch_size must be at least 1".to_string(),
            ));
        }
        self.source_retry.validate()?;
        self.store_retry.validate()?;
        self.embedding_retry.validate()
    }
}

// =============================================================================
// SEARCH
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// RRF smoothing constant; must be positive.
    pub rrf_k: f64,
    /// Candidates per path = `limit * overfetch`.
    pub overfetch: usize,
    pub vector_weight: f64,
    pub fulltext_weight: f64,
    /// Deadline for each store or embedding call.
    pub call_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            overfetch: DEFAULT_OVERFETCH,
            vector_weight: DEFAULT_PATH_WEIGHT,
            fulltext_weight: DEFAULT_PATH_WEIGHT,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ScholarError> {
        if !(self.rrf_k.is_finite() && self.rrf_k > 0.0) {
            return Err(ScholarError::InvalidArgument(format!(
                "rrf_k must be a positive number, got {}",
                self.rrf_k
            )));
        }
        for (name, w) in [
            ("vector_weight", self.vector_weight),
            ("fulltext_weight", self.fulltext_weight),
        ] {
            if !(w.is_finite() && w >= 0.0) {
                return Err(ScholarError::InvalidArgument(format!(
                    "{name} must be a non-negative number, got {w}"
                )));
            }
        }
        if self.overfetch == 0 {
            return Err(ScholarError::InvalidArgument(
                "overfetch must be at least 1".to_string(),
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(ScholarError::InvalidArgument(
                "call_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
