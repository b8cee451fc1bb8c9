//! Tests for the OpenAlex client against a local HTTP stub.

#![allow(clippy::unwrap_used, clippy::panic)]

use scholargraph::config::OpenAlexConfig;
use scholargraph::openalex::OpenAlexClient;
use scholargraph_core::{EntityId, EntityKind};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Serve `body` as JSON for every request; returns the base URL and a
/// request counter.
async fn serve(body: Value) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let payload = body.to_string();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let payload = payload.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    payload.len(),
                    payload
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), hits)
}

fn authors_page() -> Value {
    json!({
        "meta": { "count": 3 },
        "results": [
            { "id": "https://openalex.org/A1", "display_name": "Ada Lovelace" },
            { "id": "https://openalex.org/A2", "display_name": "Alan Turing" },
            { "id": "https://openalex.org/A3", "display_name": "Grace Hopper" }
        ]
    })
}

fn client(base_url: String, cache_capacity: usize) -> OpenAlexClient {
    let config = OpenAlexConfig {
        base_url,
        min_delay_ms: 0,
        cache_capacity,
        ..OpenAlexConfig::default()
    };
    OpenAlexClient::new(&config).unwrap()
}

fn author_ids() -> Vec<EntityId> {
    ["A1", "A2", "A3"].into_iter().map(EntityId::new).collect()
}

fn names(records: &[Value]) -> Vec<&str> {
    records
        .iter()
        .map(|r| r["display_name"].as_str().unwrap())
        .collect()
}

// =============================================================================
// ID LOOKUPS
// =============================================================================

#[tokio::test]
async fn test_lookup_larger_than_cache_returns_every_record() {
    let (url, _) = serve(authors_page()).await;
    let records = client(url, 2)
        .fetch_by_ids(EntityKind::Author, &author_ids())
        .await
        .unwrap();
    assert_eq!(names(&records), vec!["Ada Lovelace", "Alan Turing", "Grace Hopper"]);
}

#[tokio::test]
async fn test_zero_capacity_disables_cache_only() {
    let (url, hits) = serve(authors_page()).await;
    let client = client(url, 0);

    let first = client
        .fetch_by_ids(EntityKind::Author, &author_ids())
        .await
        .unwrap();
    assert_eq!(first.len(), 3);

    let second = client
        .fetch_by_ids(EntityKind::Author, &author_ids())
        .await
        .unwrap();
    assert_eq!(second.len(), 3);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cached_records_are_not_refetched() {
    let (url, hits) = serve(authors_page()).await;
    let client = client(url, 100);

    client
        .fetch_by_ids(EntityKind::Author, &author_ids())
        .await
        .unwrap();
    let again = client
        .fetch_by_ids(EntityKind::Author, &author_ids()[..2])
        .await
        .unwrap();
    assert_eq!(names(&again), vec!["Ada Lovelace", "Alan Turing"]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
