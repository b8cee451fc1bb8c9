//! # Storage Backends
//!
//! Durable [`crate::graph::GraphStore`] implementations.

mod redb_store;

pub use redb_store::{RedbGraphStore, tokenize};
