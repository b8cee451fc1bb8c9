//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use crate::embedder::HttpEmbedder;
use crate::openalex::OpenAlexClient;
use scholargraph_core::{
    CancelFlag, EmbeddingGenerator, EntityKind, GraphStore, HybridSearchEngine, ImportReport,
    Importer, RedbGraphStore, RelationKind, ScholarError, SearchConfig, SearchResult,
};
use std::path::Path;
use std::sync::Arc;

const RULE_WIDTH: usize = 70;
const TABLE_WIDTH: usize = 120;
const TITLE_WIDTH: usize = 47;
const ABSTRACT_PREVIEW: usize = 150;
const LIST_PREVIEW: usize = 3;

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the database with its constraints, fulltext index and, when an
/// embedding endpoint is configured, its vector index.
pub async fn cmd_init(config: &AppConfig, json_mode: bool, force: bool) -> Result<(), ScholarError> {
    let path = &config.database.path;
    if path.exists() {
        if !force {
            return Err(ScholarError::InvalidArgument(format!(
                "Database already exists at {}. Use --force to overwrite.",
                path.display()
            )));
        }
        std::fs::remove_file(path).map_err(|e| {
            ScholarError::Io(format!("cannot remove {}: {}", path.display(), e))
        })?;
        tracing::info!(path = %path.display(), "removed existing database");
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            ScholarError::Io(format!("cannot create {}: {}", parent.display(), e))
        })?;
    }

    let store = RedbGraphStore::open(path)?;
    store.ensure_constraints().await?;
    let embedder = build_embedder(config)?;
    if let Some(ref e) = embedder {
        store.ensure_vector_index(e.dimension()).await?;
    }
    let vector_dimension = embedder.as_ref().map(|e| e.dimension());

    if json_mode {
        let output = serde_json::json!({
            "database": path.to_string_lossy(),
            "constraints": EntityKind::ALL.iter().map(|k| k.constraint_name()).collect::<Vec<_>>(),
            "vector_index_dimension": vector_dimension,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Initialized new database at {}", path.display());
    match vector_dimension {
        Some(d) => println!("Vector index: {} dimensions", d),
        None => println!("Vector index: not created (no embedding endpoint configured)"),
    }
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import works matching `query`; Ctrl-C stops at the next batch boundary.
pub async fn cmd_import(
    config: &AppConfig,
    json_mode: bool,
    query: &str,
    limit: usize,
    expand_depth: u32,
    skip_abstracts: bool,
    generate_embeddings: bool,
    batch_size: Option<usize>,
) -> Result<(), ScholarError> {
    if expand_depth < 1 {
        return Err(ScholarError::InvalidArgument(
            "--expand-depth must be at least 1".to_string(),
        ));
    }

    let mut import = config.import.clone();
    import.max_depth = expand_depth - 1;
    import.skip_abstracts |= skip_abstracts;
    import.generate_embeddings |= generate_embeddings;
    if let Some(size) = batch_size {
        import.batch_size = size;
    }
    import.validate()?;

    let embedder = build_embedder(config)?;
    if import.generate_embeddings && embedder.is_none() {
        return Err(ScholarError::Config(
            "--generate-embeddings needs an embedding endpoint ([embedding].url or SCHOLARGRAPH_EMBEDDING_URL)"
                .to_string(),
        ));
    }

    if !json_mode {
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("OpenAlex Import");
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("Query: {}", query);
        println!("Limit: {} works", limit);
        println!("Expand depth: {}", expand_depth);
        println!("Database: {}", config.database.path.display());
        println!(
            "OpenAlex email: {}",
            config
                .openalex
                .email
                .as_deref()
                .unwrap_or("(not set - using anonymous pool)")
        );
        println!("{}", "=".repeat(RULE_WIDTH));
        println!();
    }

    let source = Arc::new(OpenAlexClient::new(&config.openalex)?);
    let store = Arc::new(RedbGraphStore::open(&config.database.path)?);
    let importer = Importer::new(source, store, embedder, import);

    let cancel = CancelFlag::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping at the next batch boundary");
                cancel.cancel();
            }
        })
    };
    let result = importer.run(query, limit, cancel).await;
    watcher.abort();
    let report = result?;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
    } else {
        print!("{}", format_import_summary(&report));
    }
    Ok(())
}

/// Node and relationship counts of one import, boxed like the header.
pub fn format_import_summary(report: &ImportReport) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let persisted = &report.persisted;
    let frontier = &report.frontier;
    let mut lines = vec![
        rule.clone(),
        "Import Complete!".to_string(),
        rule.clone(),
        String::new(),
        "Nodes written:".to_string(),
    ];
    for kind in EntityKind::ALL {
        let n = persisted.nodes.get(&kind).copied().unwrap_or(0);
        lines.push(format!("  {}s: {}", kind, n));
    }
    lines.push(String::new());
    lines.push("Relationships created:".to_string());
    for relation in RelationKind::ALL {
        let n = persisted.edges_created.get(&relation).copied().unwrap_or(0);
        lines.push(format!("  {}: {}", relation, n));
    }
    lines.push(String::new());
    lines.push(format!("Seeds: {}", frontier.seeds));
    lines.push(format!("Works expanded: {}", frontier.works_expanded));
    lines.push(format!("Malformed records skipped: {}", frontier.malformed_skipped));
    lines.push(format!("Failed lookups skipped: {}", frontier.lookups_failed));
    lines.push(format!(
        "Edges skipped (missing endpoint): {}",
        persisted.edges_missing_endpoint
    ));
    if persisted.embeddings_attached > 0 || persisted.embedding_failures > 0 {
        lines.push(format!("Embeddings attached: {}", persisted.embeddings_attached));
        lines.push(format!(
            "Batches without embeddings: {}",
            persisted.embedding_failures
        ));
    }
    lines.push(rule);
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// =============================================================================
// SEARCH COMMAND
// =============================================================================

/// Hybrid search over the stored works.
pub async fn cmd_search(
    config: &AppConfig,
    json_mode: bool,
    query: &str,
    limit: usize,
    params: &SearchConfig,
) -> Result<(), ScholarError> {
    let store = Arc::new(open_existing(&config.database.path)?);
    let embedder = build_embedder(config)?;
    let engine = HybridSearchEngine::new(store, embedder, config.search);
    let response = engine.search_with(query, limit, params).await?;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_default()
        );
        return Ok(());
    }

    if let Some(ref reason) = response.degraded {
        println!("Vector search unavailable ({}); ranking by fulltext only.", reason);
        println!();
    }
    println!("{}", format_results_table(&response.results));
    Ok(())
}

/// Join the first few names, noting how many were left out.
fn preview_list(names: &[&str]) -> String {
    let mut out = names
        .iter()
        .take(LIST_PREVIEW)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > LIST_PREVIEW {
        out.push_str(&format!(", ... (+{} more)", names.len() - LIST_PREVIEW));
    }
    out
}

/// Render search results as a fixed-width table with detail lines.
pub fn format_results_table(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    let rule = "=".repeat(TABLE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        format!(
            "{:<4} {:<8} {:<50} {:<6} {:<10} {:<4}",
            "#", "Score", "Title", "Year", "Citations", "OA"
        ),
        rule.clone(),
    ];

    for result in results {
        let ctx = &result.context;
        let work = &ctx.work;

        let title = if work.title.chars().count() > TITLE_WIDTH {
            let head: String = work.title.chars().take(TITLE_WIDTH - 3).collect();
            format!("{head}...")
        } else {
            work.title.clone()
        };
        let year = work
            .publication_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let oa = if work.is_oa { "Yes" } else { "No" };

        lines.push(format!(
            "{:<4} {:<8.4} {:<50} {:<6} {:<10} {:<4}",
            result.rank, result.score, title, year, work.cited_by_count, oa
        ));

        if work.work_type.is_some() {
            lines.push(format!("     Type: {}", work.type_label()));
        }
        let authors: Vec<&str> = ctx.authors.iter().map(|a| a.display_name.as_str()).collect();
        if !authors.is_empty() {
            lines.push(format!("     Authors: {}", preview_list(&authors)));
        }
        let institutions: Vec<&str> = ctx
            .institutions
            .iter()
            .map(|i| i.display_name.as_str())
            .collect();
        if !institutions.is_empty() {
            lines.push(format!("     Institutions: {}", preview_list(&institutions)));
        }
        let topics: Vec<&str> = ctx.topics.iter().map(|t| t.display_name.as_str()).collect();
        if !topics.is_empty() {
            lines.push(format!("     Topics: {}", preview_list(&topics)));
        }
        if let Some(ref source) = ctx.source {
            lines.push(format!("     Source: {}", source.display_name));
        }
        if let Some(ref doi) = work.doi {
            lines.push(format!("     DOI: {}", doi));
        }
        if let Some(abs) = work.abstract_text.as_deref().filter(|a| !a.is_empty()) {
            let mut preview: String = abs.chars().take(ABSTRACT_PREVIEW).collect();
            if abs.chars().count() > ABSTRACT_PREVIEW {
                preview.push_str("...");
            }
            lines.push(format!("     Abstract: {}", preview));
        }
        lines.push(String::new());
    }

    lines.push(rule);
    lines.join("\n")
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show node counts per kind and relationship counts per type.
pub async fn cmd_status(config: &AppConfig, json_mode: bool) -> Result<(), ScholarError> {
    let path = &config.database.path;
    let store = open_existing(path)?;
    let stats = store.stats().await?;

    if json_mode {
        let nodes: serde_json::Map<String, serde_json::Value> = EntityKind::ALL
            .iter()
            .map(|k| (k.to_string(), stats.nodes.get(k).copied().unwrap_or(0).into()))
            .collect();
        let edges: serde_json::Map<String, serde_json::Value> = RelationKind::ALL
            .iter()
            .map(|r| (r.to_string(), stats.edges.get(r).copied().unwrap_or(0).into()))
            .collect();
        let output = serde_json::json!({
            "database": path.to_string_lossy(),
            "nodes": nodes,
            "edges": edges,
            "node_total": stats.node_total(),
            "edge_total": stats.edge_total(),
            "embedded_works": stats.embedded_works,
            "vector_index_dimension": stats.vector_index_dimension,
            "embeddings_configured": config.embeddings_available(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("scholargraph Status");
    println!("===================");
    println!("Database: {}", path.display());
    println!();
    println!("Nodes ({}):", stats.node_total());
    for kind in EntityKind::ALL {
        println!(
            "  {:<16} {}",
            format!("{}s", kind),
            stats.nodes.get(&kind).copied().unwrap_or(0)
        );
    }
    println!();
    println!("Relationships ({}):", stats.edge_total());
    for relation in RelationKind::ALL {
        println!(
            "  {:<16} {}",
            relation.to_string(),
            stats.edges.get(&relation).copied().unwrap_or(0)
        );
    }
    println!();
    match stats.vector_index_dimension {
        Some(d) => println!(
            "Vector index: {} dimensions, {} works embedded",
            d, stats.embedded_works
        ),
        None => println!("Vector index: none"),
    }

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open a database that `init` or `import` already created.
pub fn open_existing(path: &Path) -> Result<RedbGraphStore, ScholarError> {
    if !path.exists() {
        return Err(ScholarError::InvalidArgument(format!(
            "No database at {}. Run `scholargraph init` or `scholargraph import` first.",
            path.display()
        )));
    }
    RedbGraphStore::open(path)
}

/// The configured embedding endpoint, if any.
pub fn build_embedder(
    config: &AppConfig,
) -> Result<Option<Arc<dyn EmbeddingGenerator>>, ScholarError> {
    Ok(HttpEmbedder::from_config(&config.embedding)?
        .map(|e| Arc::new(e) as Arc<dyn EmbeddingGenerator>))
}
