//! # Expansion Frontier
//!
//! Breadth-first discovery of the working set, starting from the works a
//! search returns.
//!
//! ## Working set layout
//!
//! Entities live in an arena (`Vec<Entity>`) indexed by id through a
//! `BTreeMap`; edges are `(RelationKind, source_idx, target_idx)` triples in
//! a `BTreeSet`, so no edge can be recorded twice and iteration order is
//! stable across runs.
//!
//! ## Depth rule
//!
//! A work popped at depth `d` is always expanded (all its related lookups
//! run). Cited works it discovers are queued at `d + 1` only when
//! `d < max_depth`; otherwise they stay in the set as leaves. Non-work
//! entities are always leaves, except that a newly found Source is completed
//! with its publisher in one extra hop.
//!
//! ## Failures
//!
//! The seed search failing aborts the run. A related lookup that still fails
//! after retries, or a related record that does not normalize, is logged,
//! counted in [`FrontierReport`] and skipped.

use crate::cancel::CancelFlag;
use crate::config::ImportConfig;
use crate::graph::RecordSource;
use crate::model::{Entity, RelationRef};
use crate::normalize::{NormalizeOptions, normalize};
use crate::retry::{RetryError, with_retry};
use crate::types::{EntityId, EntityKind, RelationKind, ScholarError};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// WORKING SET
// =============================================================================

/// Deduplicated entities and edges discovered by one run.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    arena: Vec<Entity>,
    index: BTreeMap<EntityId, usize>,
    edges: BTreeSet<(RelationKind, usize, usize)>,
}

impl WorkingSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entity` unless its id is already present. Returns `true` if added.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.index.contains_key(entity.id()) {
            return false;
        }
        self.index.insert(entity.id().clone(), self.arena.len());
        self.arena.push(entity);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.index.get(id).and_then(|&i| self.arena.get(i))
    }

    /// Record an edge between two present entities whose kinds match the
    /// relation. Returns `false` (and records nothing) otherwise.
    pub fn link(&mut self, relation: RelationKind, source: &EntityId, target: &EntityId) -> bool {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        let kinds_match = self.arena[s].kind() == relation.source_kind()
            && self.arena[t].kind() == relation.target_kind();
        if !kinds_match {
            return false;
        }
        self.edges.insert((relation, s, t));
        true
    }

    #[must_use]
    pub fn has_edge(&self, relation: RelationKind, source: &str, target: &str) -> bool {
        let lookup = |id: &str| self.index.get(&EntityId::new(id)).copied();
        match (lookup(source), lookup(target)) {
            (Some(s), Some(t)) => self.edges.contains(&(relation, s, t)),
            _ => false,
        }
    }

    /// Entities of `kind`, ordered by id.
    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.index
            .values()
            .filter_map(|&i| self.arena.get(i))
            .filter(move |e| e.kind() == kind)
    }

    /// `(source, target)` pairs of `relation`, ordered.
    #[must_use]
    pub fn edges_of(&self, relation: RelationKind) -> Vec<(EntityId, EntityId)> {
        let mut pairs: Vec<(EntityId, EntityId)> = self
            .edges
            .iter()
            .filter(|(r, _, _)| *r == relation)
            .map(|&(_, s, t)| (self.arena[s].id().clone(), self.arena[t].id().clone()))
            .collect();
        pairs.sort();
        pairs
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.entities_of(kind).count()
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// What the traversal did, beyond the working set itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrontierReport {
    pub seeds: usize,
    pub works_expanded: usize,
    pub malformed_skipped: usize,
    pub lookups_failed: usize,
    /// Lookups not issued because every target was already known.
    pub lookups_avoided: usize,
    /// Declared references whose endpoint never made it into the set.
    pub dangling_refs: usize,
}

// =============================================================================
// FRONTIER
// =============================================================================

/// Drives [`RecordSource`] calls breadth-first from a set of seed works.
pub struct ExpansionFrontier<'a> {
    source: &'a dyn RecordSource,
    config: &'a ImportConfig,
    cancel: CancelFlag,
    set: WorkingSet,
    declared: BTreeMap<EntityId, Vec<RelationRef>>,
    visited: BTreeSet<EntityId>,
    queue: VecDeque<(EntityId, u32)>,
    report: FrontierReport,
}

impl<'a> ExpansionFrontier<'a> {
    #[must_use]
    pub fn new(source: &'a dyn RecordSource, config: &'a ImportConfig, cancel: CancelFlag) -> Self {
        Self {
            source,
            config,
            cancel,
            set: WorkingSet::new(),
            declared: BTreeMap::new(),
            visited: BTreeSet::new(),
            queue: VecDeque::new(),
            report: FrontierReport::default(),
        }
    }

    fn options(&self) -> NormalizeOptions {
        NormalizeOptions {
            skip_abstracts: self.config.skip_abstracts,
        }
    }

    /// Search for seeds, expand them, and return the deduplicated working set.
    pub async fn run(
        mut self,
        query: &str,
        limit: usize,
    ) -> Result<(WorkingSet, FrontierReport), ScholarError> {
        let seeds = with_retry(&self.config.source_retry, "search", || {
            self.source.search(query, limit)
        })
        .await
        .map_err(|e| source_unavailable("seed search", e))?;

        tracing::info!(query, received = seeds.len(), "seed search complete");

        for raw in &seeds {
            if let Some(id) = self.admit(EntityKind::Work, raw) {
                self.report.seeds += 1;
                self.queue.push_back((id, 0));
            }
        }

        while let Some((work_id, depth)) = self.queue.pop_front() {
            self.cancel.check()?;
            if !self.visited.insert(work_id.clone()) {
                continue;
            }
            self.expand_work(&work_id, depth).await;
        }

        self.link_declared();
        tracing::info!(
            nodes = self.set.node_count(),
            edges = self.set.edge_count(),
            works_expanded = self.report.works_expanded,
            lookups_failed = self.report.lookups_failed,
            "expansion complete"
        );
        Ok((self.set, self.report))
    }

    async fn expand_work(&mut self, work_id: &EntityId, depth: u32) {
        self.report.works_expanded += 1;
        let refs = self.declared.get(work_id).cloned().unwrap_or_default();

        let mut pending = Vec::new();
        for relation in RelationKind::WORK_LOOKUPS {
            let targets: BTreeSet<&EntityId> = refs
                .iter()
                .filter(|r| r.relation == relation)
                .map(RelationRef::lookup_target)
                .collect();
            if targets.is_empty() {
                continue;
            }
            if targets.iter().all(|id| self.set.contains(id)) {
                self.report.lookups_avoided += 1;
                continue;
            }
            pending.push(relation);
        }
        tracing::debug!(work = %work_id, depth, lookups = pending.len(), "expanding work");

        let fetched = self.fetch_all(work_id, &pending).await;

        let mut new_sources = Vec::new();
        for (relation, outcome) in fetched {
            let records = match outcome {
                Ok(records) => records,
                Err(e) => {
                    self.report.lookups_failed += 1;
                    tracing::warn!(
                        work = %work_id,
                        relation = relation.as_str(),
                        attempts = e.attempts,
                        error = %e.last,
                        "related lookup failed, skipping"
                    );
                    continue;
                }
            };
            for raw in &records {
                let Some(id) = self.admit(relation.lookup_kind(), raw) else {
                    continue;
                };
                match relation.lookup_kind() {
                    EntityKind::Work if depth < self.config.max_depth => {
                        self.queue.push_back((id, depth + 1));
                    }
                    EntityKind::Source => new_sources.push(id),
                    _ => {}
                }
            }
        }

        self.complete_sources(&new_sources).await;
    }

    /// Fetch the publisher of each newly added source, concurrently.
    async fn complete_sources(&mut self, sources: &[EntityId]) {
        let mut pending = Vec::new();
        for source_id in sources {
            let publishers: Vec<&EntityId> = self
                .declared
                .get(source_id)
                .into_iter()
                .flatten()
                .filter(|r| r.relation == RelationKind::PublishedBy)
                .map(|r| &r.target)
                .collect();
            if publishers.is_empty() {
                continue;
            }
            if publishers.iter().all(|id| self.set.contains(id)) {
                self.report.lookups_avoided += 1;
                continue;
            }
            pending.push(source_id.clone());
        }

        let policy = self.config.source_retry;
        let source = self.source;
        let lookups = pending.iter().map(|source_id| async move {
            let outcome = with_retry(&policy, "fetch_related", || {
                source.fetch_related(source_id, RelationKind::PublishedBy)
            })
            .await;
            (source_id, outcome)
        });
        let results = futures::future::join_all(lookups).await;

        for (source_id, outcome) in results {
            match outcome {
                Ok(records) => {
                    for raw in &records {
                        self.admit(EntityKind::Publisher, raw);
                    }
                }
                Err(e) => {
                    self.report.lookups_failed += 1;
                    tracing::warn!(
                        source = %source_id,
                        attempts = e.attempts,
                        error = %e.last,
                        "publisher lookup failed, skipping"
                    );
                }
            }
        }
    }

    /// Run the lookups of one work concurrently; results come back in
    /// `relations` order so merging stays deterministic.
    async fn fetch_all(
        &self,
        work_id: &EntityId,
        relations: &[RelationKind],
    ) -> Vec<(RelationKind, Result<Vec<Value>, RetryError>)> {
        let policy = self.config.source_retry;
        let source = self.source;
        let lookups = relations.iter().map(|&relation| async move {
            let outcome = with_retry(&policy, relation.as_str(), || {
                source.fetch_related(work_id, relation)
            })
            .await;
            (relation, outcome)
        });
        futures::future::join_all(lookups).await
    }

    /// Normalize `raw` as `kind` and add it to the set. Returns the id only
    /// when the entity is new.
    fn admit(&mut self, kind: EntityKind, raw: &Value) -> Option<EntityId> {
        let normalized = match normalize(kind, raw, self.options()) {
            Ok(n) => n,
            Err(e) => {
                self.report.malformed_skipped += 1;
                tracing::warn!(kind = kind.as_str(), error = %e, "skipping malformed record");
                return None;
            }
        };
        let id = normalized.entity.id().clone();
        if !self.set.insert(normalized.entity) {
            return None;
        }
        if !normalized.refs.is_empty() {
            self.declared.insert(id.clone(), normalized.refs);
        }
        Some(id)
    }

    /// Turn every declared reference whose endpoints are both present into an edge.
    fn link_declared(&mut self) {
        for refs in self.declared.values() {
            for r in refs {
                if !self.set.link(r.relation, &r.source, &r.target) {
                    self.report.dangling_refs += 1;
                }
            }
        }
    }
}

fn source_unavailable(what: &str, err: RetryError) -> ScholarError {
    match err.last {
        ScholarError::SourceUnavailable(msg) => {
            ScholarError::SourceUnavailable(format!("{what} failed after {} attempt(s): {msg}", err.attempts))
        }
        other => ScholarError::SourceUnavailable(format!(
            "{what} failed after {} attempt(s): {other}",
            err.attempts
        )),
    }
}
