//! # Hybrid Search
//!
//! Two independently ranked retrieval paths merged with Reciprocal Rank
//! Fusion:
//!
//! ```text
//! score(id) = wv / (k + rank_v(id)) + wf / (k + rank_f(id))
//! ```
//!
//! Ranks are 1-based; an id missing from a list contributes 0 for it. Ties
//! are broken by ascending id so the output is a pure function of the inputs.
//!
//! The vector path is optional. Without an embedding model, without a vector
//! index, or when the query cannot be embedded, the engine runs in degraded
//! mode and the fused ranking equals the fulltext-only ranking.

use crate::config::SearchConfig;
use crate::graph::{EmbeddingGenerator, GraphStore};
use crate::model::{ScoredId, WorkContext};
use crate::primitives::MAX_SEARCH_LIMIT;
use crate::retry::with_deadline;
use crate::types::{EntityId, RetrievalStage, ScholarError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// RECIPROCAL RANK FUSION
// =============================================================================

/// One entry of a fused ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedHit {
    pub id: EntityId,
    pub score: f64,
    pub vector_rank: Option<usize>,
    pub fulltext_rank: Option<usize>,
}

/// Fuse two ranked id lists (best first).
///
/// Duplicates inside one list keep their best (first) rank. `params` must
/// have passed [`SearchConfig::validate`].
pub fn fuse(vector: &[EntityId], fulltext: &[EntityId], params: &SearchConfig) -> Vec<FusedHit> {
    let mut hits: BTreeMap<&EntityId, FusedHit> = BTreeMap::new();

    for (i, id) in vector.iter().enumerate() {
        let hit = hits.entry(id).or_insert_with(|| empty_hit(id));
        if hit.vector_rank.is_none() {
            hit.vector_rank = Some(i + 1);
        }
    }
    for (i, id) in fulltext.iter().enumerate() {
        let hit = hits.entry(id).or_insert_with(|| empty_hit(id));
        if hit.fulltext_rank.is_none() {
            hit.fulltext_rank = Some(i + 1);
        }
    }

    let contribution = |weight: f64, rank: Option<usize>| match rank {
        Some(r) => weight / (params.rrf_k + r as f64),
        None => 0.0,
    };

    let mut fused: Vec<FusedHit> = hits
        .into_values()
        .map(|mut hit| {
            hit.score = contribution(params.vector_weight, hit.vector_rank)
                + contribution(params.fulltext_weight, hit.fulltext_rank);
            hit
        })
        .collect();

    fused.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    fused
}

fn empty_hit(id: &EntityId) -> FusedHit {
    FusedHit {
        id: id.clone(),
        score: 0.0,
        vector_rank: None,
        fulltext_rank: None,
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Why the vector path did not contribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NoEmbeddingAvailable {
    NoEmbedder,
    NoVectorIndex,
    QueryEmbeddingFailed(String),
}

impl std::fmt::Display for NoEmbeddingAvailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoEmbedder => f.write_str("no embedding model configured"),
            Self::NoVectorIndex => f.write_str("store has no vector index"),
            Self::QueryEmbeddingFailed(e) => write!(f, "query embedding failed: {e}"),
        }
    }
}

/// A hydrated search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub rank: usize,
    pub score: f64,
    pub vector_rank: Option<usize>,
    pub fulltext_rank: Option<usize>,
    pub context: WorkContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Set when the vector path was skipped.
    pub degraded: Option<NoEmbeddingAvailable>,
    pub vector_candidates: usize,
    pub fulltext_candidates: usize,
}

// =============================================================================
// ENGINE
// =============================================================================

pub struct HybridSearchEngine {
    store: Arc<dyn GraphStore>,
    embedder: Option<Arc<dyn EmbeddingGenerator>>,
    config: SearchConfig,
}

impl HybridSearchEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Option<Arc<dyn EmbeddingGenerator>>,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Search with the engine's configured weights and `k`.
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse, ScholarError> {
        self.search_with(query, limit, &self.config).await
    }

    /// Search with per-request fusion parameters.
    pub async fn search_with(
        &self,
        query: &str,
        limit: usize,
        params: &SearchConfig,
    ) -> Result<SearchResponse, ScholarError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScholarError::EmptyQuery);
        }
        params.validate()?;
        if limit == 0 || limit > MAX_SEARCH_LIMIT {
            return Err(ScholarError::InvalidArgument(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}"
            )));
        }
        let depth = limit.saturating_mul(params.overfetch);

        let (vector, fulltext) = tokio::join!(
            self.vector_path(query, depth, params.call_timeout_ms),
            self.fulltext_path(query, depth, params.call_timeout_ms)
        );
        let fulltext = fulltext?;
        let (vector, degraded) = match vector? {
            Ok(hits) => (hits, None),
            Err(reason) => {
                tracing::info!(reason = %reason, "vector path unavailable, using fulltext only");
                (Vec::new(), Some(reason))
            }
        };

        let vector_ids: Vec<EntityId> = vector.into_iter().map(|h| h.id).collect();
        let fulltext_ids: Vec<EntityId> = fulltext.into_iter().map(|h| h.id).collect();
        let fused = fuse(&vector_ids, &fulltext_ids, params);

        tracing::debug!(
            vector = vector_ids.len(),
            fulltext = fulltext_ids.len(),
            fused = fused.len(),
            "rank fusion complete"
        );

        let results = self.hydrate(fused, limit, params.call_timeout_ms).await?;
        Ok(SearchResponse {
            results,
            degraded,
            vector_candidates: vector_ids.len(),
            fulltext_candidates: fulltext_ids.len(),
        })
    }

    /// Outer `Err` is a store failure; inner `Err` means degraded mode.
    async fn vector_path(
        &self,
        query: &str,
        k: usize,
        timeout_ms: u64,
    ) -> Result<Result<Vec<ScoredId>, NoEmbeddingAvailable>, ScholarError> {
        let Some(embedder) = self.embedder.as_deref() else {
            return Ok(Err(NoEmbeddingAvailable::NoEmbedder));
        };
        let has_index = with_deadline(timeout_ms, self.store.has_vector_index())
            .await
            .map_err(|e| retrieval(RetrievalStage::Vector, e))?;
        if !has_index {
            return Ok(Err(NoEmbeddingAvailable::NoVectorIndex));
        }
        let vector = match with_deadline(timeout_ms, embedder.embed(query)).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, model = embedder.model_name(), "query embedding failed");
                return Ok(Err(NoEmbeddingAvailable::QueryEmbeddingFailed(e.to_string())));
            }
        };
        let hits = with_deadline(timeout_ms, self.store.vector_query(&vector, k))
            .await
            .map_err(|e| retrieval(RetrievalStage::Vector, e))?;
        Ok(Ok(hits))
    }

    async fn fulltext_path(
        &self,
        query: &str,
        k: usize,
        timeout_ms: u64,
    ) -> Result<Vec<ScoredId>, ScholarError> {
        with_deadline(timeout_ms, self.store.fulltext_query(query, k))
            .await
            .map_err(|e| retrieval(RetrievalStage::Fulltext, e))
    }

    /// One batched store call for every fused candidate; order follows
    /// `fused`. Ids without a stored work are skipped before the page is cut
    /// to `limit`.
    async fn hydrate(
        &self,
        fused: Vec<FusedHit>,
        limit: usize,
        timeout_ms: u64,
    ) -> Result<Vec<SearchResult>, ScholarError> {
        if fused.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<EntityId> = fused.iter().map(|h| h.id.clone()).collect();
        let contexts = with_deadline(timeout_ms, self.store.fetch_related_for_results(&ids))
            .await
            .map_err(|e| retrieval(RetrievalStage::Hydrate, e))?;
        let mut by_id: BTreeMap<EntityId, WorkContext> = contexts
            .into_iter()
            .map(|c| (c.work.id.clone(), c))
            .collect();

        let mut results = Vec::with_capacity(limit.min(fused.len()));
        for hit in fused {
            if results.len() == limit {
                break;
            }
            let Some(context) = by_id.remove(&hit.id) else {
                tracing::debug!(id = %hit.id, "ranked id has no stored work, dropping");
                continue;
            };
            results.push(SearchResult {
                rank: results.len() + 1,
                score: hit.score,
                vector_rank: hit.vector_rank,
                fulltext_rank: hit.fulltext_rank,
                context,
            });
        }
        Ok(results)
    }
}

fn retrieval(stage: RetrievalStage, err: ScholarError) -> ScholarError {
    ScholarError::RetrievalFailure {
        stage,
        cause: err.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<EntityId> {
        list.iter().map(|s| EntityId::new(*s)).collect()
    }

    fn order(hits: &[FusedHit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn balanced_fusion_example() {
        let fused = fuse(
            &ids(&["W1", "W2", "W3"]),
            &ids(&["W2", "W1", "W4"]),
            &SearchConfig::default(),
        );
        let top: Vec<&str> = order(&fused)[..2].to_vec();
        assert!(top.contains(&"W1") && top.contains(&"W2"));
        // W1 and W2 tie exactly; ascending id breaks the tie
        assert_eq!(order(&fused), vec!["W1", "W2", "W3", "W4"]);
        let expected = 0.5 / 61.0 + 0.5 / 62.0;
        assert!((fused[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn absent_from_list_contributes_zero() {
        let fused = fuse(&ids(&["W1"]), &[], &SearchConfig::default());
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].fulltext_rank, None);
        assert!((fused[0].score - 0.5 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn duplicate_keeps_best_rank() {
        let fused = fuse(&ids(&["W1", "W2", "W1"]), &[], &SearchConfig::default());
        let w1 = fused.iter().find(|h| h.id.as_str() == "W1").unwrap();
        assert_eq!(w1.vector_rank, Some(1));
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn zero_weight_silences_a_path() {
        let params = SearchConfig {
            vector_weight: 0.0,
            fulltext_weight: 1.0,
            ..SearchConfig::default()
        };
        let fused = fuse(&ids(&["W9", "W8"]), &ids(&["W1", "W2"]), &params);
        assert_eq!(&order(&fused)[..2], &["W1", "W2"]);
    }

    #[test]
    fn empty_inputs_fuse_to_nothing() {
        assert!(fuse(&[], &[], &SearchConfig::default()).is_empty());
    }
}
