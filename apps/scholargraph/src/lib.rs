//! # scholargraph
//!
//! The application side of scholargraph: the OpenAlex [`RecordSource`],
//! the HTTP [`EmbeddingGenerator`], configuration loading and the CLI.
//!
//! [`RecordSource`]: scholargraph_core::RecordSource
//! [`EmbeddingGenerator`]: scholargraph_core::EmbeddingGenerator

pub mod cli;
pub mod config;
pub mod embedder;
pub mod openalex;
