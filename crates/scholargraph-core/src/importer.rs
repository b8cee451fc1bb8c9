//! # Import Orchestrator
//!
//! One bounded batch job: seed search, frontier expansion, two-phase
//! persistence. The working set lives only for the duration of `run`.

use crate::cancel::CancelFlag;
use crate::config::ImportConfig;
use crate::frontier::{ExpansionFrontier, FrontierReport};
use crate::graph::{EmbeddingGenerator, GraphStore, RecordSource};
use crate::persist::{GraphBatchPersister, PersistReport};
use crate::primitives::MAX_IMPORT_LIMIT;
use crate::types::ScholarError;
use serde::Serialize;
use std::sync::Arc;

/// Statistics of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub frontier: FrontierReport,
    pub persisted: PersistReport,
}

pub struct Importer {
    source: Arc<dyn RecordSource>,
    store: Arc<dyn GraphStore>,
    embedder: Option<Arc<dyn EmbeddingGenerator>>,
    config: ImportConfig,
}

impl Importer {
    #[must_use]
    pub fn new(
        source: Arc<dyn RecordSource>,
        store: Arc<dyn GraphStore>,
        embedder: Option<Arc<dyn EmbeddingGenerator>>,
        config: ImportConfig,
    ) -> Self {
        Self {
            source,
            store,
            embedder,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import the works matching `query` (at most `limit` seeds) and
    /// everything they reference, up to the configured depth.
    pub async fn run(
        &self,
        query: &str,
        limit: usize,
        cancel: CancelFlag,
    ) -> Result<ImportReport, ScholarError> {
        self.config.validate()?;
        if query.trim().is_empty() {
            return Err(ScholarError::EmptyQuery);
        }
        if limit == 0 || limit > MAX_IMPORT_LIMIT {
            return Err(ScholarError::InvalidArgument(format!(
                "limit must be between 1 and {MAX_IMPORT_LIMIT}, got {limit}"
            )));
        }

        tracing::info!(
            query,
            limit,
            max_depth = self.config.max_depth,
            batch_size = self.config.batch_size,
            "starting import"
        );

        let frontier = ExpansionFrontier::new(self.source.as_ref(), &self.config, cancel.clone());
        let (set, frontier_report) = frontier.run(query, limit).await?;

        let persister = GraphBatchPersister::new(
            self.store.as_ref(),
            self.embedder.as_deref(),
            &self.config,
            cancel,
        );
        let persisted = persister.persist(&set).await?;

        tracing::info!(
            nodes = set.node_count(),
            edges = set.edge_count(),
            embeddings = persisted.embeddings_attached,
            "import complete"
        );
        Ok(ImportReport {
            frontier: frontier_report,
            persisted,
        })
    }
}
