//! # Pipeline Primitives
//!
//! Fixed constants shared by the import and retrieval pipelines.
//! Tunables that a user may change live in [`crate::config`]; the values
//! here are their defaults and hard limits.

/// Default number of records per persistence batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default RRF smoothing constant `k`.
///
/// Larger values flatten the advantage of top-ranked items.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Default candidate over-fetch factor: each retrieval path returns
/// `limit * DEFAULT_OVERFETCH` candidates before fusion.
pub const DEFAULT_OVERFETCH: usize = 2;

/// Default weight of each retrieval path in fusion.
pub const DEFAULT_PATH_WEIGHT: f64 = 0.5;

/// Characters of abstract appended to the title for the embedding input.
pub const EMBEDDING_ABSTRACT_CHARS: usize = 1000;

/// Dimension of the default sentence embedding model (all-MiniLM-L6-v2).
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Name of the fulltext index over `Work.title` + `Work.abstract_text`.
pub const FULLTEXT_INDEX_NAME: &str = "work_fulltext";

/// Name of the vector index over `Work.embedding`.
pub const VECTOR_INDEX_NAME: &str = "work_embedding";

// =============================================================================
// RETRY DEFAULTS
// =============================================================================

/// Attempts per collaborator call, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff before the second attempt; doubles on every further attempt.
pub const DEFAULT_BASE_DELAY_MS: u64 = 200;

/// Upper bound on a single backoff sleep.
pub const MAX_BACKOFF_MS: u64 = 10_000;

/// Deadline for one collaborator call.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Largest search result page a caller may request.
pub const MAX_SEARCH_LIMIT: usize = 1000;

/// Largest seed count for one import run.
pub const MAX_IMPORT_LIMIT: usize = 10_000;

// =============================================================================
// BM25 PARAMETERS
// =============================================================================

/// Term-frequency saturation.
pub const BM25_K1: f64 = 1.2;

/// Document-length normalisation.
pub const BM25_B: f64 = 0.75;
