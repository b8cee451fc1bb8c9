//! # Graph Data Model
//!
//! Typed node payloads for the seven entity kinds, the closed `Entity`
//! variant over them, and the records exchanged with a `GraphStore`.

use crate::types::{EntityId, EntityKind, RelationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ENTITY PAYLOADS
// =============================================================================

/// A scholarly work (article, preprint, book chapter, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub id: EntityId,
    pub title: String,
    pub abstract_text: Option<String>,
    pub publication_year: Option<i32>,
    pub publication_date: Option<String>,
    pub work_type: Option<String>,
    pub is_oa: bool,
    pub doi: Option<String>,
    pub cited_by_count: u64,
}

impl Work {
    /// Text fed to the embedding model: the title, then at most
    /// [`crate::primitives::EMBEDDING_ABSTRACT_CHARS`] characters of abstract.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        match self.abstract_text.as_deref() {
            Some(abs) if !abs.is_empty() => {
                let head: String = abs
                    .chars()
                    .take(crate::primitives::EMBEDDING_ABSTRACT_CHARS)
                    .collect();
                format!("{}. {}", self.title, head)
            }
            _ => self.title.clone(),
        }
    }

    /// The work type as a CamelCase label (`journal-article` becomes
    /// `JournalArticle`); untyped works are plain `Work`.
    #[must_use]
    pub fn type_label(&self) -> String {
        match self.work_type.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.split('-').map(capitalize).collect(),
            _ => EntityKind::Work.as_str().to_string(),
        }
    }
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: EntityId,
    pub display_name: String,
    pub orcid: Option<String>,
    pub works_count: u64,
    pub cited_by_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: EntityId,
    pub display_name: String,
    pub ror: Option<String>,
    pub country_code: Option<String>,
    pub institution_type: Option<String>,
    pub works_count: u64,
}

/// A publication venue (journal, repository, conference series).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: EntityId,
    pub display_name: String,
    pub issn_l: Option<String>,
    pub issn: Vec<String>,
    pub source_type: Option<String>,
    pub works_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: EntityId,
    pub display_name: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub id: EntityId,
    pub display_name: String,
    pub country_codes: Vec<String>,
    pub works_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funder {
    pub id: EntityId,
    pub display_name: String,
    pub country_code: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// ENTITY
// =============================================================================

/// Closed tagged variant over the seven entity kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    Work(Work),
    Author(Author),
    Institution(Institution),
    Source(Source),
    Topic(Topic),
    Publisher(Publisher),
    Funder(Funder),
}

impl Entity {
    #[must_use]
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Work(e) => &e.id,
            Self::Author(e) => &e.id,
            Self::Institution(e) => &e.id,
            Self::Source(e) => &e.id,
            Self::Topic(e) => &e.id,
            Self::Publisher(e) => &e.id,
            Self::Funder(e) => &e.id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Work(_) => EntityKind::Work,
            Self::Author(_) => EntityKind::Author,
            Self::Institution(_) => EntityKind::Institution,
            Self::Source(_) => EntityKind::Source,
            Self::Topic(_) => EntityKind::Topic,
            Self::Publisher(_) => EntityKind::Publisher,
            Self::Funder(_) => EntityKind::Funder,
        }
    }

    /// Title for works, display name for everything else.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Work(e) => &e.title,
            Self::Author(e) => &e.display_name,
            Self::Institution(e) => &e.display_name,
            Self::Source(e) => &e.display_name,
            Self::Topic(e) => &e.display_name,
            Self::Publisher(e) => &e.display_name,
            Self::Funder(e) => &e.display_name,
        }
    }

    #[must_use]
    pub fn as_work(&self) -> Option<&Work> {
        match self {
            Self::Work(w) => Some(w),
            _ => None,
        }
    }
}

// =============================================================================
// RELATIONSHIP REFERENCES
// =============================================================================

/// A typed, directed edge declared by a record, by id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationRef {
    pub relation: RelationKind,
    pub source: EntityId,
    pub target: EntityId,
}

impl RelationRef {
    #[must_use]
    pub fn new(relation: RelationKind, source: EntityId, target: EntityId) -> Self {
        Self {
            relation,
            source,
            target,
        }
    }

    /// The endpoint a `fetch_related` lookup for this relation resolves.
    #[must_use]
    pub fn lookup_target(&self) -> &EntityId {
        match self.relation {
            RelationKind::Authored => &self.source,
            _ => &self.target,
        }
    }
}

// =============================================================================
// STORE RECORDS
// =============================================================================

/// One node handed to `GraphStore::upsert_nodes`.
///
/// `embedding` is only ever set for works; `None` leaves a stored vector intact.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeUpsert {
    pub entity: Entity,
    pub embedding: Option<Vec<f32>>,
}

impl NodeUpsert {
    #[must_use]
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            embedding: None,
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A ranked hit from one retrieval path. Higher `score` is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: EntityId,
    pub score: f64,
}

/// A work plus the neighbours shown next to it in search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkContext {
    pub work: Work,
    pub authors: Vec<Author>,
    pub institutions: Vec<Institution>,
    pub topics: Vec<Topic>,
    pub source: Option<Source>,
    pub publisher: Option<Publisher>,
}

/// Node and edge counts of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: BTreeMap<EntityKind, u64>,
    pub edges: BTreeMap<RelationKind, u64>,
    pub vector_index_dimension: Option<usize>,
    pub embedded_works: u64,
}

impl GraphStats {
    #[must_use]
    pub fn node_total(&self) -> u64 {
        self.nodes.values().sum()
    }

    #[must_use]
    pub fn edge_total(&self) -> u64 {
        self.edges.values().sum()
    }
}
