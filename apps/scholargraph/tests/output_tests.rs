//! Tests for result rendering and for normalization of OpenAlex-shaped
//! payloads as the client receives them.

#![allow(clippy::unwrap_used, clippy::panic)]

use scholargraph::cli::{format_import_summary, format_results_table};
use scholargraph::openalex::{ID_BATCH_SIZE, endpoint, id_filter};
use scholargraph_core::{
    Author, Entity, EntityId, EntityKind, ImportReport, Institution, NormalizeOptions,
    RelationKind, SearchResult, Source, Topic, Work, WorkContext, normalize,
};
use serde_json::json;

fn work(id: &str, title: &str) -> Work {
    Work {
        id: EntityId::new(id),
        title: title.to_string(),
        abstract_text: None,
        publication_year: None,
        publication_date: None,
        work_type: None,
        is_oa: false,
        doi: None,
        cited_by_count: 0,
    }
}

fn result(rank: usize, score: f64, work: Work) -> SearchResult {
    SearchResult {
        rank,
        score,
        vector_rank: Some(rank),
        fulltext_rank: None,
        context: WorkContext {
            work,
            authors: Vec::new(),
            institutions: Vec::new(),
            topics: Vec::new(),
            source: None,
            publisher: None,
        },
    }
}

fn author(n: usize) -> Author {
    Author {
        id: EntityId::new(format!("A{n}")),
        display_name: format!("Author {n}"),
        orcid: None,
        works_count: 0,
        cited_by_count: 0,
    }
}

// =============================================================================
// RESULTS TABLE
// =============================================================================

#[test]
fn test_empty_results() {
    assert_eq!(format_results_table(&[]), "No results found.");
}

#[test]
fn test_row_layout() {
    let mut w = work("W1", "Neural nets");
    w.publication_year = Some(2020);
    w.cited_by_count = 42;
    w.is_oa = true;
    let table = format_results_table(&[result(1, 0.032_786_885, w)]);
    let lines: Vec<&str> = table.lines().collect();

    assert_eq!(lines[0], "=".repeat(120));
    assert!(lines[1].starts_with("#    Score    Title"));
    assert_eq!(lines[2], "=".repeat(120));
    assert!(lines[3].starts_with("1    0.0328   Neural nets"));
    assert!(lines[3].contains(" 2020   42         Yes"));
    assert_eq!(*lines.last().unwrap(), "=".repeat(120));
    assert!(!table.contains("Type:"));
}

#[test]
fn test_long_title_and_missing_year() {
    let title = "A very long title about graph neural networks for citation recommendation";
    let table = format_results_table(&[result(1, 0.5, work("W1", title))]);
    let row = table.lines().nth(3).unwrap();

    let expected: String = title.chars().take(44).collect();
    assert!(row.contains(&format!("{expected}...")));
    assert!(!row.contains(title));
    assert!(row.contains("N/A"));
    assert!(row.trim_end().ends_with("No"));
}

#[test]
fn test_detail_lines() {
    let mut w = work("W1", "Neural nets");
    w.doi = Some("10.1234/nn".to_string());
    w.work_type = Some("journal-article".to_string());
    w.abstract_text = Some("x".repeat(200));
    let mut r = result(1, 0.5, w);
    r.context.authors = (1..=5).map(author).collect();
    r.context.institutions = vec![Institution {
        id: EntityId::new("I1"),
        display_name: "MIT".to_string(),
        ror: None,
        country_code: None,
        institution_type: None,
        works_count: 0,
    }];
    r.context.topics = vec![Topic {
        id: EntityId::new("T1"),
        display_name: "Deep Learning".to_string(),
        description: None,
        keywords: Vec::new(),
    }];
    r.context.source = Some(Source {
        id: EntityId::new("S1"),
        display_name: "Nature".to_string(),
        issn_l: None,
        issn: Vec::new(),
        source_type: None,
        works_count: 0,
    });

    let table = format_results_table(&[r]);
    assert!(table.contains("     Type: JournalArticle\n"));
    assert!(table.contains("     Authors: Author 1, Author 2, Author 3, ... (+2 more)\n"));
    assert!(table.contains("     Institutions: MIT\n"));
    assert!(table.contains("     Topics: Deep Learning\n"));
    assert!(table.contains("     Source: Nature\n"));
    assert!(table.contains("     DOI: 10.1234/nn\n"));
    assert!(table.contains(&format!("     Abstract: {}...\n", "x".repeat(150))));
}

// =============================================================================
// IMPORT SUMMARY
// =============================================================================

#[test]
fn test_import_summary_lists_every_kind_and_relation() {
    let mut report = ImportReport::default();
    report.persisted.nodes.insert(EntityKind::Work, 2);
    report.persisted.nodes.insert(EntityKind::Author, 1);
    report.persisted.edges_created.insert(RelationKind::Cites, 1);
    report.frontier.seeds = 1;

    let summary = format_import_summary(&report);
    assert!(summary.contains("  Works: 2\n"));
    assert!(summary.contains("  Authors: 1\n"));
    assert!(summary.contains("  Funders: 0\n"));
    assert!(summary.contains("  CITES: 1\n"));
    assert!(summary.contains("  PUBLISHED_BY: 0\n"));
    assert!(!summary.contains("Embeddings attached"));
}

// =============================================================================
// OPENALEX PAYLOADS
// =============================================================================

#[test]
fn test_openalex_work_payload() {
    let raw = json!({
        "id": "https://openalex.org/W2741809807",
        "doi": "https://doi.org/10.7717/PEERJ.4375",
        "title": "The state of OA",
        "publication_year": 2018,
        "publication_date": "2018-02-13",
        "type": "article",
        "cited_by_count": 1200,
        "open_access": { "is_oa": true, "oa_status": "gold" },
        "authorships": [{
            "author_position": "first",
            "author": { "id": "https://openalex.org/A5023888391", "display_name": "Heather Piwowar" },
            "institutions": [{ "id": "https://openalex.org/I4200000001", "display_name": "OurResearch" }]
        }],
        "primary_location": {
            "is_oa": true,
            "source": { "id": "https://openalex.org/S1983995261", "display_name": "PeerJ" }
        },
        "topics": [{ "id": "https://openalex.org/T10102", "display_name": "Citation analysis" }],
        "grants": [{ "funder": "https://openalex.org/F4320306076", "award_id": null }],
        "referenced_works": ["https://openalex.org/W1", "https://openalex.org/W2741809807"],
        "abstract_inverted_index": { "Despite": [0], "growing": [1], "interest": [2] }
    });

    let normalized = normalize(EntityKind::Work, &raw, NormalizeOptions::default()).unwrap();
    let Entity::Work(w) = &normalized.entity else {
        panic!("expected a work");
    };
    assert_eq!(w.id, EntityId::new("W2741809807"));
    assert_eq!(w.doi.as_deref(), Some("10.7717/peerj.4375"));
    assert_eq!(w.abstract_text.as_deref(), Some("Despite growing interest"));
    assert!(w.is_oa);

    let relations: Vec<RelationKind> = normalized.refs.iter().map(|r| r.relation).collect();
    for expected in [
        RelationKind::Authored,
        RelationKind::AffiliatedWith,
        RelationKind::PublishedIn,
        RelationKind::HasTopic,
        RelationKind::FundedBy,
        RelationKind::Cites,
    ] {
        assert!(relations.contains(&expected), "missing {expected}");
    }
    // the self-citation is dropped
    assert_eq!(
        relations.iter().filter(|r| **r == RelationKind::Cites).count(),
        1
    );
}

#[test]
fn test_id_filter_batches() {
    let ids: Vec<String> = (0..ID_BATCH_SIZE).map(|i| format!("A{i}")).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let filter = id_filter(EntityKind::Author, &refs);
    assert_eq!(filter.matches("https://openalex.org/").count(), ID_BATCH_SIZE);
    assert_eq!(endpoint(EntityKind::Author), "authors");
}
