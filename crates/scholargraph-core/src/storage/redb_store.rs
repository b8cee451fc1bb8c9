//! # redb-backed Graph Store
//!
//! A disk-backed [`GraphStore`] on the redb embedded database.
//!
//! ## Layout
//!
//! - `nodes`: id → postcard-encoded [`Entity`]
//! - `kind_index`: (label, id) → () for per-kind scans and endpoint checks
//! - `edges` / `edges_rev`: (relation, from, to) and (relation, to, from)
//!   → (); tuple keys make an edge a set member, so re-adding is a no-op
//! - `embeddings`: work id → postcard-encoded `Vec<f32>`
//! - `postings`: (term, work id) → term frequency, the inverted index
//!   behind `fulltext_query` (BM25 over title + abstract)
//! - `doc_terms`: work id → (token count, distinct terms), used to retract
//!   stale postings when a work is rewritten
//! - `metadata`: schema flags, vector index dimension, corpus counters
//!
//! Every `upsert_*` call is a single ACID write transaction: a batch is
//! either fully applied or not at all.

use crate::graph::{EdgeWriteOutcome, GraphStore};
use crate::model::{
    Author, Entity, GraphStats, Institution, NodeUpsert, Publisher, ScoredId, Source, Topic, Work,
    WorkContext,
};
use crate::primitives::{BM25_B, BM25_K1, FULLTEXT_INDEX_NAME, VECTOR_INDEX_NAME};
use crate::types::{EntityId, EntityKind, RelationKind, ScholarError};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

type EdgeKey = (&'static str, &'static str, &'static str);

/// Table for nodes: id -> serialized Entity bytes
const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");

/// Table for the kind index: (kind label, id) -> ()
const KIND_INDEX: TableDefinition<(&str, &str), ()> = TableDefinition::new("kind_index");

/// Table for edges: (relation, from, to) -> ()
const EDGES: TableDefinition<(&str, &str, &str), ()> = TableDefinition::new("edges");

/// Table for reverse edges: (relation, to, from) -> ()
const EDGES_REV: TableDefinition<(&str, &str, &str), ()> = TableDefinition::new("edges_rev");

/// Table for work embeddings: id -> serialized Vec<f32>
const EMBEDDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("embeddings");

/// Table for fulltext postings: (term, id) -> term frequency
const POSTINGS: TableDefinition<(&str, &str), u32> = TableDefinition::new("postings");

/// Table for indexed documents: id -> serialized (token count, terms)
const DOC_TERMS: TableDefinition<&str, &[u8]> = TableDefinition::new("doc_terms");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const META_VECTOR_DIMENSION: &str = "vector_dimension";
const META_DOC_COUNT: &str = "fulltext_docs";
const META_TOKEN_TOTAL: &str = "fulltext_tokens";

fn storage_err(e: impl std::fmt::Display) -> ScholarError {
    ScholarError::Storage(e.to_string())
}

fn codec_err(e: impl std::fmt::Display) -> ScholarError {
    ScholarError::Serialization(e.to_string())
}

// =============================================================================
// TOKENIZER
// =============================================================================

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "by", "for", "from", "in", "is", "of", "on", "or", "the",
    "to", "with",
];

/// Lowercased alphanumeric tokens, stopwords and single characters removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn work_terms(work: &Work) -> (u32, BTreeMap<String, u32>) {
    let mut text = work.title.clone();
    if let Some(abs) = &work.abstract_text {
        text.push(' ');
        text.push_str(abs);
    }
    let tokens = tokenize(&text);
    let mut counts = BTreeMap::new();
    for t in &tokens {
        *counts.entry(t.clone()).or_insert(0u32) += 1;
    }
    (tokens.len() as u32, counts)
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

fn rank(mut hits: Vec<ScoredId>, k: usize) -> Vec<ScoredId> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    hits.truncate(k);
    hits
}

/// Node ids adjacent to `node` through `relation` in an edge table.
fn adjacent<T: ReadableTable<EdgeKey, ()>>(
    table: &T,
    relation: RelationKind,
    node: &str,
) -> Result<Vec<String>, ScholarError> {
    let rel = relation.as_str();
    let mut out = Vec::new();
    for entry in table.range((rel, node, "")..).map_err(storage_err)? {
        let (key, _) = entry.map_err(storage_err)?;
        let (r, from, to) = key.value();
        if r != rel || from != node {
            break;
        }
        out.push(to.to_string());
    }
    Ok(out)
}

// =============================================================================
// STORE
// =============================================================================

/// A disk-backed scholarly graph using redb.
pub struct RedbGraphStore {
    db: Database,
}

impl std::fmt::Debug for RedbGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbGraphStore").finish_non_exhaustive()
    }
}

impl RedbGraphStore {
    /// Open or create a graph database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScholarError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(NODES).map_err(storage_err)?;
            let _ = write_txn.open_table(KIND_INDEX).map_err(storage_err)?;
            let _ = write_txn.open_table(EDGES).map_err(storage_err)?;
            let _ = write_txn.open_table(EDGES_REV).map_err(storage_err)?;
            let _ = write_txn.open_table(EMBEDDINGS).map_err(storage_err)?;
            let _ = write_txn.open_table(POSTINGS).map_err(storage_err)?;
            let _ = write_txn.open_table(DOC_TERMS).map_err(storage_err)?;
            let _ = write_txn.open_table(METADATA).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        Ok(Self { db })
    }

    /// Look up one node by id.
    pub fn node(&self, id: &EntityId) -> Result<Option<Entity>, ScholarError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let nodes = read_txn.open_table(NODES).map_err(storage_err)?;
        match nodes.get(id.as_str()).map_err(storage_err)? {
            Some(data) => Ok(Some(postcard::from_bytes(data.value()).map_err(codec_err)?)),
            None => Ok(None),
        }
    }

    /// Ids of every node of `kind`, ascending.
    pub fn ids_of(&self, kind: EntityKind) -> Result<Vec<EntityId>, ScholarError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let index = read_txn.open_table(KIND_INDEX).map_err(storage_err)?;
        let label = kind.as_str();
        let mut ids = Vec::new();
        for entry in index.range((label, "")..).map_err(storage_err)? {
            let (key, _) = entry.map_err(storage_err)?;
            let (l, id) = key.value();
            if l != label {
                break;
            }
            ids.push(EntityId::new(id));
        }
        Ok(ids)
    }

    /// Every edge in deterministic order.
    pub fn edges(&self) -> Result<Vec<(RelationKind, EntityId, EntityId)>, ScholarError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let edges = read_txn.open_table(EDGES).map_err(storage_err)?;
        let mut out = Vec::new();
        for entry in edges.iter().map_err(storage_err)? {
            let (key, _) = entry.map_err(storage_err)?;
            let (rel, from, to) = key.value();
            let relation = RelationKind::from_label(rel)
                .ok_or_else(|| ScholarError::Storage(format!("unknown relation label '{rel}'")))?;
            out.push((relation, EntityId::new(from), EntityId::new(to)));
        }
        Ok(out)
    }

    /// Stored embedding of a work, if any.
    pub fn embedding(&self, id: &EntityId) -> Result<Option<Vec<f32>>, ScholarError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(EMBEDDINGS).map_err(storage_err)?;
        match table.get(id.as_str()).map_err(storage_err)? {
            Some(data) => Ok(Some(postcard::from_bytes(data.value()).map_err(codec_err)?)),
            None => Ok(None),
        }
    }

    /// Whether the unique constraint for `kind` has been created.
    pub fn has_constraint(&self, kind: EntityKind) -> Result<bool, ScholarError> {
        self.meta_flag(&constraint_key(kind))
    }

    fn meta_flag(&self, key: &str) -> Result<bool, ScholarError> {
        Ok(self.meta_value(key)?.is_some())
    }

    fn meta_value(&self, key: &str) -> Result<Option<u64>, ScholarError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let meta = read_txn.open_table(METADATA).map_err(storage_err)?;
        Ok(meta.get(key).map_err(storage_err)?.map(|v| v.value()))
    }
}

fn constraint_key(kind: EntityKind) -> String {
    format!("constraint:{}", kind.constraint_name())
}

fn index_key(name: &str) -> String {
    format!("index:{name}")
}

// =============================================================================
// GRAPHSTORE TRAIT IMPLEMENTATION
// =============================================================================

#[async_trait]
impl GraphStore for RedbGraphStore {
    async fn ensure_constraints(&self) -> Result<(), ScholarError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;
            for kind in EntityKind::ALL {
                meta.insert(constraint_key(kind).as_str(), 1)
                    .map_err(storage_err)?;
            }
            meta.insert(index_key(FULLTEXT_INDEX_NAME).as_str(), 1)
                .map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    async fn ensure_vector_index(&self, dimension: usize) -> Result<(), ScholarError> {
        if dimension == 0 {
            return Err(ScholarError::InvalidArgument(
                "vector index dimension must be positive".to_string(),
            ));
        }
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;
            let existing = meta
                .get(META_VECTOR_DIMENSION)
                .map_err(storage_err)?
                .map(|v| v.value());
            match existing {
                Some(d) if d != dimension as u64 => {
                    return Err(ScholarError::ConstraintViolation(format!(
                        "{VECTOR_INDEX_NAME} exists with dimension {d}, requested {dimension}"
                    )));
                }
                Some(_) => {}
                None => {
                    meta.insert(META_VECTOR_DIMENSION, dimension as u64)
                        .map_err(storage_err)?;
                }
            }
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    async fn has_vector_index(&self) -> Result<bool, ScholarError> {
        self.meta_flag(META_VECTOR_DIMENSION)
    }

    async fn upsert_nodes(
        &self,
        kind: EntityKind,
        batch: &[NodeUpsert],
    ) -> Result<usize, ScholarError> {
        if let Some(stray) = batch.iter().find(|n| n.entity.kind() != kind) {
            return Err(ScholarError::InvalidArgument(format!(
                "{} node {} in a {} batch",
                stray.entity.kind(),
                stray.entity.id(),
                kind
            )));
        }
        if batch.is_empty() {
            return Ok(0);
        }

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut nodes = write_txn.open_table(NODES).map_err(storage_err)?;
            let mut index = write_txn.open_table(KIND_INDEX).map_err(storage_err)?;
            let mut embeddings = write_txn.open_table(EMBEDDINGS).map_err(storage_err)?;
            let mut postings = write_txn.open_table(POSTINGS).map_err(storage_err)?;
            let mut doc_terms = write_txn.open_table(DOC_TERMS).map_err(storage_err)?;
            let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;

            let dimension = meta
                .get(META_VECTOR_DIMENSION)
                .map_err(storage_err)?
                .map(|v| v.value() as usize);

            for node in batch {
                let id = node.entity.id().as_str();

                let previous_kind = match nodes.get(id).map_err(storage_err)? {
                    Some(data) => Some(
                        postcard::from_bytes::<Entity>(data.value())
                            .map_err(codec_err)?
                            .kind(),
                    ),
                    None => None,
                };
                if let Some(previous) = previous_kind {
                    if previous != kind {
                        return Err(ScholarError::ConstraintViolation(format!(
                            "id {id} already stored as {previous}, cannot store as {kind}"
                        )));
                    }
                }

                let bytes = postcard::to_allocvec(&node.entity).map_err(codec_err)?;
                nodes.insert(id, bytes.as_slice()).map_err(storage_err)?;
                index.insert((kind.as_str(), id), ()).map_err(storage_err)?;

                if let Some(vector) = &node.embedding {
                    if let Some(d) = dimension {
                        if vector.len() != d {
                            return Err(ScholarError::ConstraintViolation(format!(
                                "embedding for {id} has dimension {}, index expects {d}",
                                vector.len()
                            )));
                        }
                    }
                    let bytes = postcard::to_allocvec(vector).map_err(codec_err)?;
                    embeddings.insert(id, bytes.as_slice()).map_err(storage_err)?;
                }

                let Some(work) = node.entity.as_work() else {
                    continue;
                };

                // Retract the previous version of this document from the index.
                let previous_doc = match doc_terms.get(id).map_err(storage_err)? {
                    Some(data) => Some(
                        postcard::from_bytes::<(u32, Vec<String>)>(data.value())
                            .map_err(codec_err)?,
                    ),
                    None => None,
                };
                let mut doc_count = meta
                    .get(META_DOC_COUNT)
                    .map_err(storage_err)?
                    .map(|v| v.value())
                    .unwrap_or(0);
                let mut token_total = meta
                    .get(META_TOKEN_TOTAL)
                    .map_err(storage_err)?
                    .map(|v| v.value())
                    .unwrap_or(0);
                match previous_doc {
                    Some((len, terms)) => {
                        token_total = token_total.saturating_sub(u64::from(len));
                        for term in &terms {
                            postings.remove((term.as_str(), id)).map_err(storage_err)?;
                        }
                    }
                    None => doc_count += 1,
                }

                let (len, counts) = work_terms(work);
                for (term, tf) in &counts {
                    postings
                        .insert((term.as_str(), id), *tf)
                        .map_err(storage_err)?;
                }
                let terms: Vec<String> = counts.into_keys().collect();
                let doc = postcard::to_allocvec(&(len, terms)).map_err(codec_err)?;
                doc_terms.insert(id, doc.as_slice()).map_err(storage_err)?;
                token_total += u64::from(len);

                meta.insert(META_DOC_COUNT, doc_count).map_err(storage_err)?;
                meta.insert(META_TOKEN_TOTAL, token_total)
                    .map_err(storage_err)?;
            }
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(batch.len())
    }

    async fn upsert_edges(
        &self,
        relation: RelationKind,
        batch: &[(EntityId, EntityId)],
    ) -> Result<EdgeWriteOutcome, ScholarError> {
        let mut outcome = EdgeWriteOutcome::default();
        if batch.is_empty() {
            return Ok(outcome);
        }
        let rel = relation.as_str();
        let from_label = relation.source_kind().as_str();
        let to_label = relation.target_kind().as_str();

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let index = write_txn.open_table(KIND_INDEX).map_err(storage_err)?;
            let mut edges = write_txn.open_table(EDGES).map_err(storage_err)?;
            let mut edges_rev = write_txn.open_table(EDGES_REV).map_err(storage_err)?;

            for (from, to) in batch {
                let (from, to) = (from.as_str(), to.as_str());
                let endpoints_exist = index
                    .get((from_label, from))
                    .map_err(storage_err)?
                    .is_some()
                    && index.get((to_label, to)).map_err(storage_err)?.is_some();
                if !endpoints_exist {
                    outcome.missing_endpoint += 1;
                    continue;
                }
                if edges.get((rel, from, to)).map_err(storage_err)?.is_some() {
                    outcome.existing += 1;
                    continue;
                }
                edges.insert((rel, from, to), ()).map_err(storage_err)?;
                edges_rev.insert((rel, to, from), ()).map_err(storage_err)?;
                outcome.created += 1;
            }
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(outcome)
    }

    async fn vector_query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredId>, ScholarError> {
        let Some(dimension) = self.meta_value(META_VECTOR_DIMENSION)? else {
            return Err(ScholarError::Storage(format!(
                "{VECTOR_INDEX_NAME} does not exist"
            )));
        };
        if vector.len() as u64 != dimension {
            return Err(ScholarError::InvalidArgument(format!(
                "query vector has dimension {}, index expects {dimension}",
                vector.len()
            )));
        }

        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(EMBEDDINGS).map_err(storage_err)?;
        let mut hits = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (key, value) = entry.map_err(storage_err)?;
            let stored: Vec<f32> = postcard::from_bytes(value.value()).map_err(codec_err)?;
            if stored.len() != vector.len() {
                continue;
            }
            hits.push(ScoredId {
                id: EntityId::new(key.value()),
                score: cosine(vector, &stored),
            });
        }
        Ok(rank(hits, k))
    }

    async fn fulltext_query(&self, text: &str, k: usize) -> Result<Vec<ScoredId>, ScholarError> {
        let terms: BTreeSet<String> = tokenize(text).into_iter().collect();
        if terms.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let postings = read_txn.open_table(POSTINGS).map_err(storage_err)?;
        let doc_terms = read_txn.open_table(DOC_TERMS).map_err(storage_err)?;
        let meta = read_txn.open_table(METADATA).map_err(storage_err)?;

        let doc_count = meta
            .get(META_DOC_COUNT)
            .map_err(storage_err)?
            .map(|v| v.value())
            .unwrap_or(0);
        if doc_count == 0 {
            return Ok(Vec::new());
        }
        let token_total = meta
            .get(META_TOKEN_TOTAL)
            .map_err(storage_err)?
            .map(|v| v.value())
            .unwrap_or(0);
        let n = doc_count as f64;
        let avgdl = (token_total as f64 / n).max(1.0);

        let mut doc_len: BTreeMap<String, f64> = BTreeMap::new();
        let mut scores: BTreeMap<String, f64> = BTreeMap::new();
        for term in &terms {
            let mut matches: Vec<(String, u32)> = Vec::new();
            for entry in postings.range((term.as_str(), "")..).map_err(storage_err)? {
                let (key, tf) = entry.map_err(storage_err)?;
                let (t, id) = key.value();
                if t != term.as_str() {
                    break;
                }
                matches.push((id.to_string(), tf.value()));
            }
            if matches.is_empty() {
                continue;
            }
            let df = matches.len() as f64;
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();

            for (id, tf) in matches {
                let dl = match doc_len.get(&id) {
                    Some(dl) => *dl,
                    None => {
                        let len = match doc_terms.get(id.as_str()).map_err(storage_err)? {
                            Some(data) => {
                                postcard::from_bytes::<(u32, Vec<String>)>(data.value())
                                    .map_err(codec_err)?
                                    .0
                            }
                            None => 0,
                        };
                        doc_len.insert(id.clone(), f64::from(len));
                        f64::from(len)
                    }
                };
                let tf = f64::from(tf);
                let norm = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * dl / avgdl);
                *scores.entry(id).or_insert(0.0) += idf * tf * (BM25_K1 + 1.0) / norm;
            }
        }

        let hits = scores
            .into_iter()
            .map(|(id, score)| ScoredId {
                id: EntityId::new(id),
                score,
            })
            .collect();
        Ok(rank(hits, k))
    }

    async fn fetch_related_for_results(
        &self,
        ids: &[EntityId],
    ) -> Result<Vec<WorkContext>, ScholarError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let nodes = read_txn.open_table(NODES).map_err(storage_err)?;
        let edges = read_txn.open_table(EDGES).map_err(storage_err)?;
        let edges_rev = read_txn.open_table(EDGES_REV).map_err(storage_err)?;

        let load = |id: &str| -> Result<Option<Entity>, ScholarError> {
            match nodes.get(id).map_err(storage_err)? {
                Some(data) => Ok(Some(postcard::from_bytes(data.value()).map_err(codec_err)?)),
                None => Ok(None),
            }
        };

        let mut contexts = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(Entity::Work(work)) = load(id.as_str())? else {
                continue;
            };

            let mut authors: Vec<Author> = Vec::new();
            let mut institution_ids: BTreeSet<String> = BTreeSet::new();
            for author_id in adjacent(&edges_rev, RelationKind::Authored, id.as_str())? {
                for inst in adjacent(&edges, RelationKind::AffiliatedWith, &author_id)? {
                    institution_ids.insert(inst);
                }
                if let Some(Entity::Author(a)) = load(&author_id)? {
                    authors.push(a);
                }
            }

            let mut institutions: Vec<Institution> = Vec::new();
            for inst_id in &institution_ids {
                if let Some(Entity::Institution(i)) = load(inst_id)? {
                    institutions.push(i);
                }
            }

            let mut topics: Vec<Topic> = Vec::new();
            for topic_id in adjacent(&edges, RelationKind::HasTopic, id.as_str())? {
                if let Some(Entity::Topic(t)) = load(&topic_id)? {
                    topics.push(t);
                }
            }

            let mut source: Option<Source> = None;
            let mut publisher: Option<Publisher> = None;
            if let Some(source_id) = adjacent(&edges, RelationKind::PublishedIn, id.as_str())?
                .into_iter()
                .next()
            {
                if let Some(Entity::Source(s)) = load(&source_id)? {
                    if let Some(pub_id) = adjacent(&edges, RelationKind::PublishedBy, &source_id)?
                        .into_iter()
                        .next()
                    {
                        if let Some(Entity::Publisher(p)) = load(&pub_id)? {
                            publisher = Some(p);
                        }
                    }
                    source = Some(s);
                }
            }

            contexts.push(WorkContext {
                work,
                authors,
                institutions,
                topics,
                source,
                publisher,
            });
        }
        Ok(contexts)
    }

    async fn stats(&self) -> Result<GraphStats, ScholarError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let index = read_txn.open_table(KIND_INDEX).map_err(storage_err)?;
        let edges = read_txn.open_table(EDGES).map_err(storage_err)?;
        let embeddings = read_txn.open_table(EMBEDDINGS).map_err(storage_err)?;
        let meta = read_txn.open_table(METADATA).map_err(storage_err)?;

        let mut stats = GraphStats::default();
        for entry in index.iter().map_err(storage_err)? {
            let (key, _) = entry.map_err(storage_err)?;
            let (label, _) = key.value();
            if let Some(kind) = EntityKind::from_label(label) {
                *stats.nodes.entry(kind).or_insert(0) += 1;
            }
        }
        for entry in edges.iter().map_err(storage_err)? {
            let (key, _) = entry.map_err(storage_err)?;
            let (rel, _, _) = key.value();
            if let Some(relation) = RelationKind::from_label(rel) {
                *stats.edges.entry(relation).or_insert(0) += 1;
            }
        }
        stats.embedded_works = embeddings.len().map_err(storage_err)?;
        stats.vector_index_dimension = meta
            .get(META_VECTOR_DIMENSION)
            .map_err(storage_err)?
            .map(|v| v.value() as usize);
        Ok(stats)
    }
}
