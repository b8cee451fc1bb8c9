//! # Core Type Definitions
//!
//! This module contains the vocabulary shared by the import and retrieval
//! pipelines:
//! - Entity identifiers and the closed set of entity kinds (`EntityId`, `EntityKind`)
//! - The closed set of relationship types (`RelationKind`)
//! - Pipeline phase markers used in error reporting (`Phase`, `RetrievalStage`)
//! - Error types (`ScholarError`)
//!
//! ## Ordering Guarantees
//!
//! Every identifier type implements `Ord`, so working sets kept in
//! `BTreeMap`/`BTreeSet` iterate in the same order on every run.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Canonical identifier of a scholarly entity (e.g. `W2741809807`).
///
/// Always the bare provider key, never the URL form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create a new identifier from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The entity kind implied by the identifier's prefix letter, if any.
    #[must_use]
    pub fn kind_hint(&self) -> Option<EntityKind> {
        self.0.chars().next().and_then(EntityKind::from_prefix)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ENTITY KINDS
// =============================================================================

/// The seven node labels of the scholarly graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Work,
    Author,
    Institution,
    Source,
    Topic,
    Publisher,
    Funder,
}

impl EntityKind {
    /// All kinds, in the order nodes are persisted.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Work,
        EntityKind::Author,
        EntityKind::Institution,
        EntityKind::Source,
        EntityKind::Topic,
        EntityKind::Publisher,
        EntityKind::Funder,
    ];

    /// Label used in the graph store and in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Author => "Author",
            Self::Institution => "Institution",
            Self::Source => "Source",
            Self::Topic => "Topic",
            Self::Publisher => "Publisher",
            Self::Funder => "Funder",
        }
    }

    /// Leading letter of provider identifiers for this kind.
    #[must_use]
    pub const fn prefix(self) -> char {
        match self {
            Self::Work => 'W',
            Self::Author => 'A',
            Self::Institution => 'I',
            Self::Source => 'S',
            Self::Topic => 'T',
            Self::Publisher => 'P',
            Self::Funder => 'F',
        }
    }

    #[must_use]
    pub fn from_prefix(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.prefix() == c)
    }

    /// Parse a label produced by [`EntityKind::as_str`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == label)
    }

    /// Name of the per-kind unique constraint on `id`.
    #[must_use]
    pub fn constraint_name(self) -> String {
        format!("{}_id_unique", self.as_str().to_lowercase())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// RELATION KINDS
// =============================================================================

/// The seven directed relationship types of the scholarly graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Author → Work
    Authored,
    /// Author → Institution
    AffiliatedWith,
    /// Work → Source
    PublishedIn,
    /// Work → Work
    Cites,
    /// Work → Topic
    HasTopic,
    /// Work → Funder
    FundedBy,
    /// Source → Publisher
    PublishedBy,
}

impl RelationKind {
    /// All relation types, in the order edges are persisted.
    pub const ALL: [RelationKind; 7] = [
        RelationKind::Authored,
        RelationKind::AffiliatedWith,
        RelationKind::PublishedIn,
        RelationKind::Cites,
        RelationKind::HasTopic,
        RelationKind::FundedBy,
        RelationKind::PublishedBy,
    ];

    /// Relations looked up when a Work is expanded.
    pub const WORK_LOOKUPS: [RelationKind; 6] = [
        RelationKind::Authored,
        RelationKind::AffiliatedWith,
        RelationKind::PublishedIn,
        RelationKind::Cites,
        RelationKind::HasTopic,
        RelationKind::FundedBy,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authored => "AUTHORED",
            Self::AffiliatedWith => "AFFILIATED_WITH",
            Self::PublishedIn => "PUBLISHED_IN",
            Self::Cites => "CITES",
            Self::HasTopic => "HAS_TOPIC",
            Self::FundedBy => "FUNDED_BY",
            Self::PublishedBy => "PUBLISHED_BY",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == label)
    }

    /// Kind of the edge's tail.
    #[must_use]
    pub const fn source_kind(self) -> EntityKind {
        match self {
            Self::Authored | Self::AffiliatedWith => EntityKind::Author,
            Self::PublishedIn | Self::Cites | Self::HasTopic | Self::FundedBy => EntityKind::Work,
            Self::PublishedBy => EntityKind::Source,
        }
    }

    /// Kind of the edge's head.
    #[must_use]
    pub const fn target_kind(self) -> EntityKind {
        match self {
            Self::Authored | Self::Cites => EntityKind::Work,
            Self::AffiliatedWith => EntityKind::Institution,
            Self::PublishedIn => EntityKind::Source,
            Self::HasTopic => EntityKind::Topic,
            Self::FundedBy => EntityKind::Funder,
            Self::PublishedBy => EntityKind::Publisher,
        }
    }

    /// Kind of the records a `fetch_related` lookup for this relation returns.
    ///
    /// For most relations this is the head; for AUTHORED the lookup starts
    /// from the Work and returns Authors (the tail).
    #[must_use]
    pub const fn lookup_kind(self) -> EntityKind {
        match self {
            Self::Authored => EntityKind::Author,
            other => other.target_kind(),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PIPELINE STAGES
// =============================================================================

/// Persistence phase a batch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Nodes,
    Edges,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nodes => f.write_str("nodes"),
            Self::Edges => f.write_str("edges"),
        }
    }
}

/// Retrieval step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalStage {
    Vector,
    Fulltext,
    Hydrate,
}

impl fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector => f.write_str("vector"),
            Self::Fulltext => f.write_str("fulltext"),
            Self::Hydrate => f.write_str("hydrate"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in scholargraph operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScholarError {
    /// A raw record lacks its identifier or display name, or has the wrong shape.
    #[error("Malformed {kind} record: {reason}")]
    MalformedRecord { kind: EntityKind, reason: String },

    /// The metadata provider could not be reached or returned an error.
    #[error("Record source unavailable: {0}")]
    SourceUnavailable(String),

    /// Graph store failure (I/O, transaction, table access).
    #[error("Storage error: {0}")]
    Storage(String),

    /// An upsert would give an existing id a second kind.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The embedding model failed or returned an unusable vector.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A collaborator call exceeded its deadline.
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    /// A persistence batch kept failing after every retry.
    #[error(
        "Persistence failed in {phase} phase for {label} batch {batch_index} after {attempts} attempt(s): {cause}"
    )]
    PersistenceFailure {
        phase: Phase,
        label: String,
        batch_index: usize,
        attempts: u32,
        cause: String,
    },

    /// A graph store query failed during search.
    #[error("Retrieval failed during {stage} stage: {cause}")]
    RetrievalFailure { stage: RetrievalStage, cause: String },

    /// The search query is empty or whitespace only.
    #[error("Query text is empty")]
    EmptyQuery,

    /// A caller-supplied parameter is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The run was cancelled at a batch boundary.
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration could not be read or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local file I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl ScholarError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::Storage(_) | Self::Timeout(_) | Self::Embedding(_)
        )
    }
}
