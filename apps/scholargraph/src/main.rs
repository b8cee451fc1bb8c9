//! # scholargraph
//!
//! Build a local citation graph from OpenAlex and search it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 apps/scholargraph (THE BINARY)               │
//! │                                                              │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │  │    CLI      │   │  OpenAlexClient  │   │ HttpEmbedder │  │
//! │  │   (clap)    │   │    (reqwest)     │   │  (reqwest)   │  │
//! │  └──────┬──────┘   └────────┬─────────┘   └──────┬───────┘  │
//! │         └───────────────────┼────────────────────┘          │
//! │                             ▼                               │
//! │                  ┌─────────────────────┐                    │
//! │                  │  scholargraph-core  │                    │
//! │                  │  import + retrieval │                    │
//! │                  └─────────────────────┘                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! scholargraph init
//! scholargraph import "graph neural networks" --limit 50 --expand-depth 2
//! scholargraph search "message passing" --limit 10
//! scholargraph status
//! ```

use clap::Parser;
use scholargraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // SCHOLARGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("SCHOLARGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "scholargraph=debug,scholargraph_core=debug"
    } else {
        "scholargraph=info,scholargraph_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        "scholargraph v{} - OpenAlex citation graph\n",
        env!("CARGO_PKG_VERSION")
    );
}
