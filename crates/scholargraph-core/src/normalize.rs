//! # Entity Normalizer
//!
//! Turns a raw provider record (`serde_json::Value`) of a declared kind into
//! a canonical [`Entity`] plus the relationship references it declares.
//!
//! Normalization is pure: the same input always yields the same output, and
//! nothing here performs I/O.
//!
//! ## Rules
//!
//! - Identifiers arrive as URLs (`https://openalex.org/W123`); the canonical
//!   id is the last path segment and its prefix letter must match the kind.
//! - A record without an id or a display name (title for works) is rejected
//!   with [`ScholarError::MalformedRecord`].
//! - Text fields are trimmed; blank strings become absent.
//! - DOI, ORCID, ROR and ISSN values are coerced to their bare canonical form
//!   or dropped when they do not parse.
//! - Malformed references inside a record are dropped, not fatal.

use crate::model::{
    Author, Entity, Funder, Institution, Publisher, RelationRef, Source, Topic, Work,
};
use crate::types::{EntityId, EntityKind, RelationKind, ScholarError};
use serde_json::Value;
use std::collections::BTreeSet;

// =============================================================================
// OPTIONS & OUTPUT
// =============================================================================

/// Switches that change what the normalizer keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Drop reconstructed abstracts from works.
    pub skip_abstracts: bool,
}

/// A canonical entity and the edges its record declares, sorted and unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub entity: Entity,
    pub refs: Vec<RelationRef>,
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Normalize one raw record of the declared `kind`.
pub fn normalize(
    kind: EntityKind,
    raw: &Value,
    options: NormalizeOptions,
) -> Result<Normalized, ScholarError> {
    if !raw.is_object() {
        return Err(malformed(kind, "record is not a JSON object"));
    }

    let id = raw
        .get("id")
        .and_then(extract_id)
        .ok_or_else(|| malformed(kind, "missing id"))?;
    if id.kind_hint() != Some(kind) {
        return Err(malformed(
            kind,
            &format!("id '{}' does not carry the '{}' prefix", id, kind.prefix()),
        ));
    }

    let name_key = if kind == EntityKind::Work { "title" } else { "display_name" };
    let name = text(raw, name_key)
        .or_else(|| text(raw, "display_name"))
        .ok_or_else(|| malformed(kind, &format!("{} has no {}", id, name_key)))?;

    let mut refs = BTreeSet::new();
    let entity = match kind {
        EntityKind::Work => {
            collect_work_refs(&id, raw, &mut refs);
            Entity::Work(Work {
                abstract_text: if options.skip_abstracts {
                    None
                } else {
                    raw.get("abstract_inverted_index")
                        .and_then(reconstruct_abstract)
                },
                publication_year: raw
                    .get("publication_year")
                    .and_then(Value::as_i64)
                    .and_then(|y| i32::try_from(y).ok()),
                publication_date: text(raw, "publication_date"),
                work_type: text(raw, "type"),
                is_oa: raw
                    .get("open_access")
                    .and_then(|oa| oa.get("is_oa"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                doi: text(raw, "doi").and_then(|d| coerce_doi(&d)),
                cited_by_count: count(raw, "cited_by_count"),
                id,
                title: name,
            })
        }
        EntityKind::Author => Entity::Author(Author {
            orcid: text(raw, "orcid").and_then(|o| coerce_orcid(&o)),
            works_count: count(raw, "works_count"),
            cited_by_count: count(raw, "cited_by_count"),
            id,
            display_name: name,
        }),
        EntityKind::Institution => Entity::Institution(Institution {
            ror: text(raw, "ror").and_then(|r| coerce_ror(&r)),
            country_code: text(raw, "country_code").and_then(|c| coerce_country(&c)),
            institution_type: text(raw, "type"),
            works_count: count(raw, "works_count"),
            id,
            display_name: name,
        }),
        EntityKind::Source => {
            if let Some(publisher) = raw
                .get("host_organization")
                .and_then(|v| ref_id(v, EntityKind::Publisher))
            {
                refs.insert(RelationRef::new(
                    RelationKind::PublishedBy,
                    id.clone(),
                    publisher,
                ));
            }
            let issn: BTreeSet<String> = string_list(raw, "issn")
                .iter()
                .filter_map(|s| coerce_issn(s))
                .collect();
            Entity::Source(Source {
                issn_l: text(raw, "issn_l").and_then(|s| coerce_issn(&s)),
                issn: issn.into_iter().collect(),
                source_type: text(raw, "type"),
                works_count: count(raw, "works_count"),
                id,
                display_name: name,
            })
        }
        EntityKind::Topic => Entity::Topic(Topic {
            description: text(raw, "description"),
            keywords: string_list(raw, "keywords"),
            id,
            display_name: name,
        }),
        EntityKind::Publisher => {
            let codes: BTreeSet<String> = string_list(raw, "country_codes")
                .iter()
                .filter_map(|c| coerce_country(c))
                .collect();
            Entity::Publisher(Publisher {
                country_codes: codes.into_iter().collect(),
                works_count: count(raw, "works_count"),
                id,
                display_name: name,
            })
        }
        EntityKind::Funder => Entity::Funder(Funder {
            country_code: text(raw, "country_code").and_then(|c| coerce_country(&c)),
            description: text(raw, "description"),
            id,
            display_name: name,
        }),
    };

    Ok(Normalized {
        entity,
        refs: refs.into_iter().collect(),
    })
}

fn malformed(kind: EntityKind, reason: &str) -> ScholarError {
    ScholarError::MalformedRecord {
        kind,
        reason: reason.to_string(),
    }
}

// =============================================================================
// WORK REFERENCES
// =============================================================================

fn collect_work_refs(work: &EntityId, raw: &Value, refs: &mut BTreeSet<RelationRef>) {
    for authorship in array(raw, "authorships") {
        let author = authorship
            .get("author")
            .and_then(|a| ref_id(a, EntityKind::Author));
        let Some(author) = author else {
            continue;
        };
        for inst in array(authorship, "institutions") {
            if let Some(inst) = ref_id(inst, EntityKind::Institution) {
                refs.insert(RelationRef::new(
                    RelationKind::AffiliatedWith,
                    author.clone(),
                    inst,
                ));
            }
        }
        refs.insert(RelationRef::new(
            RelationKind::Authored,
            author,
            work.clone(),
        ));
    }

    if let Some(source) = raw
        .get("primary_location")
        .and_then(|loc| loc.get("source"))
        .and_then(|s| ref_id(s, EntityKind::Source))
    {
        refs.insert(RelationRef::new(
            RelationKind::PublishedIn,
            work.clone(),
            source,
        ));
    }

    for topic in array(raw, "topics") {
        if let Some(topic) = ref_id(topic, EntityKind::Topic) {
            refs.insert(RelationRef::new(
                RelationKind::HasTopic,
                work.clone(),
                topic,
            ));
        }
    }

    let grant_funders = array(raw, "grants").filter_map(|g| g.get("funder"));
    for funder in grant_funders.chain(array(raw, "funders")) {
        if let Some(funder) = ref_id(funder, EntityKind::Funder) {
            refs.insert(RelationRef::new(
                RelationKind::FundedBy,
                work.clone(),
                funder,
            ));
        }
    }

    for cited in array(raw, "referenced_works") {
        if let Some(cited) = ref_id(cited, EntityKind::Work) {
            if &cited != work {
                refs.insert(RelationRef::new(RelationKind::Cites, work.clone(), cited));
            }
        }
    }
}

// =============================================================================
// FIELD HELPERS
// =============================================================================

/// Canonical id from a URL string or an object carrying an `id` field.
pub fn extract_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::String(s) => {
            let last = s.trim().trim_end_matches('/').rsplit('/').next()?.trim();
            if last.is_empty() {
                None
            } else {
                Some(EntityId::new(last))
            }
        }
        Value::Object(map) => map.get("id").and_then(extract_id),
        _ => None,
    }
}

/// Reference id, only if it carries the prefix of `expected`.
fn ref_id(value: &Value, expected: EntityKind) -> Option<EntityId> {
    extract_id(value).filter(|id| id.kind_hint() == Some(expected))
}

fn text(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn count(raw: &Value, key: &str) -> u64 {
    raw.get(key)
        .and_then(|v| v.as_u64().or_else(|| v.as_i64().map(|n| n.max(0) as u64)))
        .unwrap_or(0)
}

fn array<'a>(raw: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> + use<'a> {
    raw.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Strings from an array of strings or of objects with a `display_name`.
fn string_list(raw: &Value, key: &str) -> Vec<String> {
    array(raw, key)
        .filter_map(|v| match v {
            Value::String(s) => Some(s.as_str()),
            Value::Object(_) => v.get("display_name").and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rebuild abstract text from a word → positions inverted index.
pub fn reconstruct_abstract(index: &Value) -> Option<String> {
    let map = index.as_object()?;
    let mut placed: Vec<(u64, &str)> = Vec::new();
    for (word, positions) in map {
        for pos in positions.as_array().into_iter().flatten() {
            if let Some(pos) = pos.as_u64() {
                placed.push((pos, word.as_str()));
            }
        }
    }
    if placed.is_empty() {
        return None;
    }
    placed.sort_unstable();
    let joined = placed
        .iter()
        .map(|(_, w)| *w)
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// =============================================================================
// IDENTIFIER COERCION
// =============================================================================

const DOI_PREFIXES: [&str; 5] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

/// `https://doi.org/10.1/ABC` → `10.1/abc`.
pub fn coerce_doi(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    let bare = DOI_PREFIXES
        .iter()
        .find_map(|p| lower.strip_prefix(*p))
        .unwrap_or(&lower)
        .trim();
    if bare.starts_with("10.") && bare.contains('/') {
        Some(bare.to_string())
    } else {
        None
    }
}

/// `https://orcid.org/0000-0002-1825-009x` → `0000-0002-1825-009X`.
pub fn coerce_orcid(raw: &str) -> Option<String> {
    let bare = raw.trim().trim_end_matches('/').rsplit('/').next()?.to_uppercase();
    let groups: Vec<&str> = bare.split('-').collect();
    let valid = groups.len() == 4
        && groups.iter().all(|g| g.len() == 4)
        && groups.iter().enumerate().all(|(gi, g)| {
            g.chars().enumerate().all(|(ci, c)| {
                c.is_ascii_digit() || (gi == 3 && ci == 3 && c == 'X')
            })
        });
    if valid { Some(bare) } else { None }
}

/// `https://ror.org/03VEK8N` → `03vek8n`.
pub fn coerce_ror(raw: &str) -> Option<String> {
    let bare = raw.trim().trim_end_matches('/').rsplit('/').next()?.to_lowercase();
    if !bare.is_empty() && bare.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(bare)
    } else {
        None
    }
}

/// `1234567x` or `1234-567x` → `1234-567X`.
pub fn coerce_issn(raw: &str) -> Option<String> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_uppercase();
    let valid = compact.len() == 8
        && compact
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || (i == 7 && c == 'X'));
    if valid {
        Some(format!("{}-{}", &compact[..4], &compact[4..]))
    } else {
        None
    }
}

fn coerce_country(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code)
    } else {
        None
    }
}
