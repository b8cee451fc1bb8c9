//! # scholargraph-core
//!
//! The scholarly knowledge graph engine: normalization of bibliographic
//! records, bounded breadth-first import, two-phase batch persistence and
//! hybrid (vector + fulltext) retrieval with Reciprocal Rank Fusion.
//!
//! ## Seams
//!
//! The pipelines talk to the outside world only through the traits in
//! [`graph`]: a [`RecordSource`] to read from, a [`GraphStore`] to write to
//! and an optional [`EmbeddingGenerator`]. This crate ships one store,
//! [`RedbGraphStore`]; the HTTP-facing source and embedder live in the
//! application crate.
//!
//! ## Determinism
//!
//! Given the same source responses, an import produces the same working
//! set and issues the same store writes in the same order. Fusion is a pure
//! function of its two input rankings.

// =============================================================================
// MODULES
// =============================================================================

pub mod cancel;
pub mod config;
pub mod frontier;
pub mod graph;
pub mod importer;
pub mod model;
pub mod normalize;
pub mod persist;
pub mod primitives;
pub mod retry;
pub mod search;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{EntityId, EntityKind, Phase, RelationKind, RetrievalStage, ScholarError};

pub use model::{
    Author, Entity, Funder, GraphStats, Institution, NodeUpsert, Publisher, RelationRef, ScoredId,
    Source, Topic, Work, WorkContext,
};

// =============================================================================
// RE-EXPORTS: Pipelines
// =============================================================================

pub use cancel::CancelFlag;
pub use config::{ImportConfig, SearchConfig};
pub use frontier::{ExpansionFrontier, FrontierReport, WorkingSet};
pub use graph::{EdgeWriteOutcome, EmbeddingGenerator, GraphStore, RecordSource};
pub use importer::{ImportReport, Importer};
pub use normalize::{NormalizeOptions, Normalized, normalize};
pub use persist::{GraphBatchPersister, NodesCommitted, PersistReport};
pub use retry::{RetryError, RetryPolicy, with_deadline, with_retry};
pub use search::{
    FusedHit, HybridSearchEngine, NoEmbeddingAvailable, SearchResponse, SearchResult, fuse,
};
pub use storage::RedbGraphStore;
