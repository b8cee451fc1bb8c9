//! # Collaborator Traits
//!
//! The three seams between the pipelines and the outside world:
//!
//! - [`RecordSource`]: the bibliographic metadata provider
//! - [`GraphStore`]: the durable property graph
//! - [`EmbeddingGenerator`]: the optional sentence embedding model
//!
//! All three are object-safe (`#[async_trait]`) so the CLI can assemble a
//! pipeline from `Arc<dyn ...>` handles and tests can substitute fakes.

use crate::model::{GraphStats, NodeUpsert, ScoredId, WorkContext};
use crate::types::{EntityId, EntityKind, RelationKind, ScholarError};
use async_trait::async_trait;
use serde_json::Value;

// =============================================================================
// RECORD SOURCE
// =============================================================================

/// Produces raw provider records.
///
/// Implementations report transport and provider failures as
/// [`ScholarError::SourceUnavailable`]; retrying is the caller's job.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Raw work records matching `query`, at most `limit` of them.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Value>, ScholarError>;

    /// Raw records `entity_id` references through `relation`.
    ///
    /// The records are of kind [`RelationKind::lookup_kind`]: authors for
    /// AUTHORED, cited works for CITES, the publisher for PUBLISHED_BY, ...
    async fn fetch_related(
        &self,
        entity_id: &EntityId,
        relation: RelationKind,
    ) -> Result<Vec<Value>, ScholarError>;
}

// =============================================================================
// GRAPH STORE
// =============================================================================

/// Counts from one `upsert_edges` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeWriteOutcome {
    /// Edges that did not exist before the call.
    pub created: usize,
    /// Edges that already existed and were left alone.
    pub existing: usize,
    /// Pairs skipped because an endpoint node is not stored.
    pub missing_endpoint: usize,
}

impl EdgeWriteOutcome {
    pub fn absorb(&mut self, other: EdgeWriteOutcome) {
        self.created += other.created;
        self.existing += other.existing;
        self.missing_endpoint += other.missing_endpoint;
    }
}

/// A durable, typed property graph with fulltext and optional vector search.
///
/// Writes are idempotent: upserting the same node or edge twice leaves the
/// store as if it had been written once.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create the per-kind unique-id constraints and the fulltext index.
    async fn ensure_constraints(&self) -> Result<(), ScholarError>;

    /// Create the vector index over `Work.embedding`, or confirm it exists
    /// with the same dimension.
    async fn ensure_vector_index(&self, dimension: usize) -> Result<(), ScholarError>;

    async fn has_vector_index(&self) -> Result<bool, ScholarError>;

    /// Create-or-update every node of `batch`; all must be of `kind`.
    /// Returns the number of nodes written.
    async fn upsert_nodes(
        &self,
        kind: EntityKind,
        batch: &[NodeUpsert],
    ) -> Result<usize, ScholarError>;

    /// Create each `(source, target)` edge of type `relation` that does not
    /// exist yet, between endpoints that do.
    async fn upsert_edges(
        &self,
        relation: RelationKind,
        batch: &[(EntityId, EntityId)],
    ) -> Result<EdgeWriteOutcome, ScholarError>;

    /// Works nearest to `vector`, best first, at most `k`.
    async fn vector_query(&self, vector: &[f32], k: usize)
    -> Result<Vec<ScoredId>, ScholarError>;

    /// Works matching `text` over title and abstract, best first, at most `k`.
    async fn fulltext_query(&self, text: &str, k: usize) -> Result<Vec<ScoredId>, ScholarError>;

    /// Hydrate works with their authors, institutions, topics, source and
    /// publisher. Unknown ids are omitted; order follows `ids`.
    async fn fetch_related_for_results(
        &self,
        ids: &[EntityId],
    ) -> Result<Vec<WorkContext>, ScholarError>;

    async fn stats(&self) -> Result<GraphStats, ScholarError>;
}

// =============================================================================
// EMBEDDING GENERATOR
// =============================================================================

/// Maps text to a fixed-length vector.
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ScholarError>;

    /// Embeddings for `texts`, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScholarError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Length of every vector this generator returns.
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}
