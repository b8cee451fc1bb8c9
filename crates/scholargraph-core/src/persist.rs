//! # Graph Batch Persister
//!
//! Writes a [`WorkingSet`] to a [`GraphStore`] in two phases:
//!
//! 1. **Nodes**: grouped by kind in [`EntityKind::ALL`] order, ordered by id,
//!    chunked by `batch_size`. Works receive their embedding here when
//!    embeddings are enabled.
//! 2. **Edges**: grouped by relation in [`RelationKind::ALL`] order, chunked
//!    the same way.
//!
//! Phase 2 takes a [`NodesCommitted`] token that only a finished phase 1 can
//! produce, so edges can never be written ahead of their endpoints.
//!
//! Every batch runs under the store retry policy. A batch that exhausts its
//! attempts aborts the run with [`ScholarError::PersistenceFailure`] naming
//! the phase, label and batch index. Because every write is an idempotent
//! upsert, rerunning after a failure converges to the same graph.

use crate::cancel::CancelFlag;
use crate::config::ImportConfig;
use crate::frontier::WorkingSet;
use crate::graph::{EdgeWriteOutcome, EmbeddingGenerator, GraphStore};
use crate::model::{Entity, NodeUpsert};
use crate::retry::{RetryError, with_retry};
use crate::types::{EntityId, EntityKind, Phase, RelationKind, ScholarError};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// REPORT & TOKEN
// =============================================================================

/// Proof that every node batch was acknowledged by the store.
#[derive(Debug)]
pub struct NodesCommitted {
    nodes: BTreeMap<EntityKind, usize>,
    embeddings_attached: usize,
    embedding_failures: usize,
    node_batches: usize,
}

/// Counts from a completed persistence run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub nodes: BTreeMap<EntityKind, usize>,
    pub edges_created: BTreeMap<RelationKind, usize>,
    pub edges_existing: usize,
    pub edges_missing_endpoint: usize,
    pub embeddings_attached: usize,
    /// Work batches written without embeddings because the model failed.
    pub embedding_failures: usize,
    pub node_batches: usize,
    pub edge_batches: usize,
}

// =============================================================================
// PERSISTER
// =============================================================================

pub struct GraphBatchPersister<'a> {
    store: &'a dyn GraphStore,
    embedder: Option<&'a dyn EmbeddingGenerator>,
    config: &'a ImportConfig,
    cancel: CancelFlag,
}

impl<'a> GraphBatchPersister<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn GraphStore,
        embedder: Option<&'a dyn EmbeddingGenerator>,
        config: &'a ImportConfig,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
            cancel,
        }
    }

    /// Schema setup, then both phases.
    pub async fn persist(&self, set: &WorkingSet) -> Result<PersistReport, ScholarError> {
        self.ensure_schema().await?;
        let committed = self.write_nodes(set).await?;
        self.write_edges(set, committed).await
    }

    /// Constraints and fulltext index; the vector index too when embeddings
    /// are enabled.
    pub async fn ensure_schema(&self) -> Result<(), ScholarError> {
        let policy = self.config.store_retry;
        with_retry(&policy, "ensure_constraints", || self.store.ensure_constraints())
            .await
            .map_err(|e| failure(Phase::Nodes, "constraints", 0, e))?;

        if let Some(embedder) = self.active_embedder()? {
            let dimension = embedder.dimension();
            with_retry(&policy, "ensure_vector_index", || {
                self.store.ensure_vector_index(dimension)
            })
            .await
            .map_err(|e| failure(Phase::Nodes, "vector_index", 0, e))?;
        }
        Ok(())
    }

    fn active_embedder(&self) -> Result<Option<&'a dyn EmbeddingGenerator>, ScholarError> {
        if !self.config.generate_embeddings {
            return Ok(None);
        }
        match self.embedder {
            Some(e) => Ok(Some(e)),
            None => Err(ScholarError::Config(
                "embeddings requested but no embedding model is configured".to_string(),
            )),
        }
    }

    /// Phase 1.
    pub async fn write_nodes(&self, set: &WorkingSet) -> Result<NodesCommitted, ScholarError> {
        let embedder = self.active_embedder()?;
        let batch_size = self.config.batch_size.max(1);
        let mut committed = NodesCommitted {
            nodes: BTreeMap::new(),
            embeddings_attached: 0,
            embedding_failures: 0,
            node_batches: 0,
        };

        for kind in EntityKind::ALL {
            let entities: Vec<&Entity> = set.entities_of(kind).collect();
            if entities.is_empty() {
                continue;
            }
            tracing::info!(kind = kind.as_str(), count = entities.len(), "writing nodes");

            for (batch_index, chunk) in entities.chunks(batch_size).enumerate() {
                self.cancel.check()?;
                let mut batch: Vec<NodeUpsert> =
                    chunk.iter().map(|e| NodeUpsert::new((*e).clone())).collect();

                if kind == EntityKind::Work {
                    if let Some(embedder) = embedder {
                        match self.embed_batch(embedder, &batch).await {
                            Ok(vectors) => {
                                committed.embeddings_attached += vectors.len();
                                for (node, vector) in batch.iter_mut().zip(vectors) {
                                    node.embedding = Some(vector);
                                }
                            }
                            Err(e) => {
                                committed.embedding_failures += 1;
                                tracing::warn!(
                                    batch_index,
                                    error = %e,
                                    "embedding failed, writing work batch without vectors"
                                );
                            }
                        }
                    }
                }

                let written = with_retry(&self.config.store_retry, "upsert_nodes", || {
                    self.store.upsert_nodes(kind, &batch)
                })
                .await
                .map_err(|e| failure(Phase::Nodes, kind.as_str(), batch_index, e))?;

                tracing::debug!(kind = kind.as_str(), batch_index, written, "node batch committed");
                *committed.nodes.entry(kind).or_insert(0) += written;
                committed.node_batches += 1;
            }
        }
        Ok(committed)
    }

    async fn embed_batch(
        &self,
        embedder: &dyn EmbeddingGenerator,
        batch: &[NodeUpsert],
    ) -> Result<Vec<Vec<f32>>, ScholarError> {
        let texts: Vec<String> = batch
            .iter()
            .filter_map(|n| n.entity.as_work())
            .map(|w| w.embedding_text())
            .collect();
        let vectors = with_retry(&self.config.embedding_retry, "embed_batch", || {
            embedder.embed_batch(&texts)
        })
        .await
        .map_err(|e| e.last)?;

        if vectors.len() != texts.len() {
            return Err(ScholarError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        let dimension = embedder.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(ScholarError::Embedding(format!(
                "expected dimension {}, got {}",
                dimension,
                bad.len()
            )));
        }
        Ok(vectors)
    }

    /// Phase 2.
    pub async fn write_edges(
        &self,
        set: &WorkingSet,
        committed: NodesCommitted,
    ) -> Result<PersistReport, ScholarError> {
        let batch_size = self.config.batch_size.max(1);
        let mut report = PersistReport {
            nodes: committed.nodes,
            embeddings_attached: committed.embeddings_attached,
            embedding_failures: committed.embedding_failures,
            node_batches: committed.node_batches,
            ..PersistReport::default()
        };

        for relation in RelationKind::ALL {
            let pairs: Vec<(EntityId, EntityId)> = set.edges_of(relation);
            if pairs.is_empty() {
                continue;
            }
            tracing::info!(relation = relation.as_str(), count = pairs.len(), "writing edges");

            let mut totals = EdgeWriteOutcome::default();
            for (batch_index, chunk) in pairs.chunks(batch_size).enumerate() {
                self.cancel.check()?;
                let outcome = with_retry(&self.config.store_retry, "upsert_edges", || {
                    self.store.upsert_edges(relation, chunk)
                })
                .await
                .map_err(|e| failure(Phase::Edges, relation.as_str(), batch_index, e))?;
                totals.absorb(outcome);
                report.edge_batches += 1;
            }

            if totals.missing_endpoint > 0 {
                tracing::warn!(
                    relation = relation.as_str(),
                    skipped = totals.missing_endpoint,
                    "edges skipped for missing endpoints"
                );
            }
            report.edges_created.insert(relation, totals.created);
            report.edges_existing += totals.existing;
            report.edges_missing_endpoint += totals.missing_endpoint;
        }
        Ok(report)
    }
}

fn failure(phase: Phase, label: &str, batch_index: usize, err: RetryError) -> ScholarError {
    ScholarError::PersistenceFailure {
        phase,
        label: label.to_string(),
        batch_index,
        attempts: err.attempts,
        cause: err.last.to_string(),
    }
}
