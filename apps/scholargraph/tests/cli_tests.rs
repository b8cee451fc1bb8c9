//! Integration tests for argument parsing, configuration resolution and the
//! store-only commands.

#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use scholargraph::cli::{Cli, Commands, cmd_init, cmd_status, open_existing, resolve_config};
use scholargraph::config::AppConfig;
use scholargraph_core::{EntityKind, GraphStore, ScholarError};
use std::io::Write;
use std::path::PathBuf;
use tempfile::tempdir;

fn config_at(path: PathBuf) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.path = path;
    config
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn test_import_defaults() {
    let cli = Cli::try_parse_from(["scholargraph", "import", "graph neural networks"]).unwrap();
    match cli.command {
        Some(Commands::Import {
            query,
            limit,
            expand_depth,
            skip_abstracts,
            generate_embeddings,
            batch_size,
        }) => {
            assert_eq!(query, "graph neural networks");
            assert_eq!(limit, 100);
            assert_eq!(expand_depth, 1);
            assert!(!skip_abstracts);
            assert!(!generate_embeddings);
            assert_eq!(batch_size, None);
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_import_flags() {
    let cli = Cli::try_parse_from([
        "scholargraph",
        "--quiet",
        "import",
        "proteins",
        "--limit",
        "25",
        "--expand-depth",
        "3",
        "--skip-abstracts",
        "--generate-embeddings",
        "--batch-size",
        "50",
    ])
    .unwrap();
    assert!(cli.quiet);
    match cli.command {
        Some(Commands::Import {
            limit,
            expand_depth,
            skip_abstracts,
            generate_embeddings,
            batch_size,
            ..
        }) => {
            assert_eq!(limit, 25);
            assert_eq!(expand_depth, 3);
            assert!(skip_abstracts);
            assert!(generate_embeddings);
            assert_eq!(batch_size, Some(50));
        }
        other => panic!("expected import, got {:?}", other),
    }
}

#[test]
fn test_import_rejects_zero_depth_and_limit() {
    assert!(Cli::try_parse_from(["scholargraph", "import", "q", "--expand-depth", "0"]).is_err());
    assert!(Cli::try_parse_from(["scholargraph", "import", "q", "--limit", "0"]).is_err());
    assert!(Cli::try_parse_from(["scholargraph", "import"]).is_err());
}

#[test]
fn test_search_fusion_overrides() {
    let cli = Cli::try_parse_from([
        "scholargraph",
        "search",
        "message passing",
        "--vector-weight",
        "0.8",
        "--rrf-k",
        "30",
        "--json-mode",
    ])
    .unwrap();
    assert!(cli.json_mode);
    match cli.command {
        Some(Commands::Search {
            query,
            limit,
            vector_weight,
            fulltext_weight,
            rrf_k,
        }) => {
            assert_eq!(query, "message passing");
            assert_eq!(limit, 10);
            assert_eq!(vector_weight, Some(0.8));
            assert_eq!(fulltext_weight, None);
            assert_eq!(rrf_k, Some(30.0));
        }
        other => panic!("expected search, got {:?}", other),
    }
}

#[test]
fn test_no_subcommand_means_status() {
    let cli = Cli::try_parse_from(["scholargraph", "-D", "/tmp/x.redb"]).unwrap();
    assert!(cli.command.is_none());
    assert_eq!(cli.database, Some(PathBuf::from("/tmp/x.redb")));
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_database_flag_overrides_config_file() {
    let dir = tempdir().expect("temp dir");
    let file = dir.path().join("scholargraph.toml");
    let mut f = std::fs::File::create(&file).unwrap();
    writeln!(f, "[database]\npath = \"from-file.redb\"\n\n[import]\nbatch_size = 64").unwrap();

    let cli = Cli::try_parse_from([
        "scholargraph",
        "--config",
        file.to_str().unwrap(),
        "--database",
        "from-flag.redb",
        "status",
    ])
    .unwrap();
    let config = resolve_config(&cli).unwrap();
    assert_eq!(config.database.path, PathBuf::from("from-flag.redb"));
    assert_eq!(config.import.batch_size, 64);
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = tempdir().expect("temp dir");
    let file = dir.path().join("bad.toml");
    std::fs::write(&file, "[search]\nrrf_k = -1.0\n").unwrap();

    let cli = Cli::try_parse_from(["scholargraph", "--config", file.to_str().unwrap()]).unwrap();
    assert!(matches!(resolve_config(&cli), Err(ScholarError::Config(_))));
}

// =============================================================================
// INIT / STATUS
// =============================================================================

#[tokio::test]
async fn test_init_creates_schema() {
    let dir = tempdir().expect("temp dir");
    let config = config_at(dir.path().join("nested").join("graph.redb"));

    cmd_init(&config, true, false).await.unwrap();

    let store = open_existing(&config.database.path).unwrap();
    for kind in EntityKind::ALL {
        assert!(store.has_constraint(kind).unwrap(), "{kind} constraint missing");
    }
    assert!(!store.has_vector_index().await.unwrap());
}

#[tokio::test]
async fn test_init_refuses_existing_database_without_force() {
    let dir = tempdir().expect("temp dir");
    let config = config_at(dir.path().join("graph.redb"));

    cmd_init(&config, true, false).await.unwrap();
    let err = cmd_init(&config, true, false).await.unwrap_err();
    assert!(matches!(err, ScholarError::InvalidArgument(_)));

    cmd_init(&config, true, true).await.unwrap();
    cmd_status(&config, true).await.unwrap();
}

#[tokio::test]
async fn test_status_needs_existing_database() {
    let dir = tempdir().expect("temp dir");
    let config = config_at(dir.path().join("missing.redb"));
    let err = cmd_status(&config, true).await.unwrap_err();
    assert!(matches!(err, ScholarError::InvalidArgument(_)));
    assert!(!config.database.path.exists());
}
