//! # scholargraph CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Create the database, its constraints and indexes
//! - `import` - Import works matching a query, plus what they reference
//! - `search` - Hybrid vector + fulltext search over imported works
//! - `status` - Node and relationship counts

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use scholargraph_core::ScholarError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// scholargraph - a local citation graph built from OpenAlex
#[derive(Parser, Debug)]
#[command(name = "scholargraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the graph database (overrides config and SCHOLARGRAPH_DB)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty database
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Import works matching a search query
    Import {
        /// OpenAlex search query
        query: String,

        /// Number of seed works to import
        #[arg(short, long, default_value = "100", value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,

        /// Citation hops to follow (1 = seeds and the works they cite)
        #[arg(short = 'd', long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        expand_depth: u32,

        /// Do not store reconstructed abstracts
        #[arg(long)]
        skip_abstracts: bool,

        /// Embed works for vector search (needs [embedding].url)
        #[arg(long)]
        generate_embeddings: bool,

        /// Records per write batch (overrides [import].batch_size)
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Search imported works
    Search {
        /// Search text
        query: String,

        /// Number of results
        #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,

        /// Weight of the vector ranking
        #[arg(long)]
        vector_weight: Option<f64>,

        /// Weight of the fulltext ranking
        #[arg(long)]
        fulltext_weight: Option<f64>,

        /// RRF smoothing constant
        #[arg(long)]
        rrf_k: Option<f64>,
    },

    /// Show graph status
    Status,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration (file, then environment, then flags) for `cli`.
pub fn resolve_config(cli: &Cli) -> Result<AppConfig, ScholarError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(ref path) = cli.database {
        config.database.path = path.clone();
    }
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ScholarError> {
    let config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&config, json_mode, force).await,
        Some(Commands::Import {
            query,
            limit,
            expand_depth,
            skip_abstracts,
            generate_embeddings,
            batch_size,
        }) => {
            cmd_import(
                &config,
                json_mode,
                &query,
                limit as usize,
                expand_depth,
                skip_abstracts,
                generate_embeddings,
                batch_size,
            )
            .await
        }
        Some(Commands::Search {
            query,
            limit,
            vector_weight,
            fulltext_weight,
            rrf_k,
        }) => {
            let mut params = config.search;
            if let Some(w) = vector_weight {
                params.vector_weight = w;
            }
            if let Some(w) = fulltext_weight {
                params.fulltext_weight = w;
            }
            if let Some(k) = rrf_k {
                params.rrf_k = k;
            }
            cmd_search(&config, json_mode, &query, limit as usize, &params).await
        }
        Some(Commands::Status) | None => cmd_status(&config, json_mode).await,
    }
}
