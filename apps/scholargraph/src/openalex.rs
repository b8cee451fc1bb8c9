//! # OpenAlex Client
//!
//! [`RecordSource`] over the OpenAlex REST API.
//!
//! - `search` pages through `/works?search=` with cursor pagination
//!   (`per_page` at most 200) until `limit` records are collected.
//! - `fetch_related` reads the references the entity's own record declares
//!   and resolves them with `filter=openalex_id:A|B|...` requests of at most
//!   50 ids each.
//!
//! Every record the client sees is kept in a bounded in-memory cache, so
//! the record a lookup starts from is usually already local and an entity
//! referenced by many works is downloaded once.
//!
//! Requests are spaced by `min_delay_ms`. HTTP 429, 5xx and transport
//! failures become [`ScholarError::SourceUnavailable`]; retrying them is the
//! caller's decision.

use crate::config::OpenAlexConfig;
use async_trait::async_trait;
use scholargraph_core::{
    EntityId, EntityKind, NormalizeOptions, RecordSource, RelationKind, ScholarError, normalize,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Ids per `openalex_id` filter request.
pub const ID_BATCH_SIZE: usize = 50;

/// Largest page OpenAlex serves.
pub const MAX_PER_PAGE: usize = 200;

const ID_URL_PREFIX: &str = "https://openalex.org/";

// =============================================================================
// URL HELPERS
// =============================================================================

/// Collection path for records of `kind`.
pub fn endpoint(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Work => "works",
        EntityKind::Author => "authors",
        EntityKind::Institution => "institutions",
        EntityKind::Source => "sources",
        EntityKind::Topic => "topics",
        EntityKind::Publisher => "publishers",
        EntityKind::Funder => "funders",
    }
}

/// The `filter` parameter selecting `ids` from the `kind` collection.
pub fn id_filter(kind: EntityKind, ids: &[&str]) -> String {
    // the topics collection names this filter differently
    let key = if kind == EntityKind::Topic {
        "openalex"
    } else {
        "openalex_id"
    };
    let joined = ids
        .iter()
        .map(|id| format!("{ID_URL_PREFIX}{id}"))
        .collect::<Vec<_>>()
        .join("|");
    format!("{key}:{joined}")
}

/// Records and the next cursor of one list response.
pub fn parse_page(body: &Value) -> Result<(Vec<Value>, Option<String>), ScholarError> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ScholarError::Serialization("OpenAlex response has no results array".to_string())
        })?
        .clone();
    let cursor = body
        .get("meta")
        .and_then(|m| m.get("next_cursor"))
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    Ok((results, cursor))
}

fn record_id(record: &Value) -> Option<String> {
    scholargraph_core::normalize::extract_id(record.get("id")?).map(|id| id.0)
}

// =============================================================================
// RECORD CACHE
// =============================================================================

/// Insertion-ordered record cache; the oldest entry goes first when full.
#[derive(Debug, Default)]
struct RecordCache {
    records: BTreeMap<String, Value>,
    order: VecDeque<String>,
    capacity: usize,
}

impl RecordCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn get(&self, id: &str) -> Option<Value> {
        self.records.get(id).cloned()
    }

    fn insert(&mut self, id: String, record: Value) {
        if self.capacity == 0 {
            return;
        }
        if self.records.insert(id.clone(), record).is_none() {
            self.order.push_back(id);
        }
        while self.records.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.records.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct OpenAlexClient {
    http: reqwest::Client,
    base_url: String,
    email: Option<String>,
    min_delay: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
    cache: Mutex<RecordCache>,
}

impl OpenAlexClient {
    pub fn new(config: &OpenAlexConfig) -> Result<Self, ScholarError> {
        let agent = match &config.email {
            Some(email) => format!(
                "scholargraph/{} (mailto:{email})",
                env!("CARGO_PKG_VERSION")
            ),
            None => format!("scholargraph/{}", env!("CARGO_PKG_VERSION")),
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(agent)
            .build()
            .map_err(|e| ScholarError::Config(format!("cannot build HTTP client: {e}")))?;

        if config.email.is_none() {
            tracing::warn!("no OpenAlex email configured, using the anonymous pool");
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            min_delay: Duration::from_millis(config.min_delay_ms),
            last_request: tokio::sync::Mutex::new(None),
            cache: Mutex::new(RecordCache::new(config.cache_capacity)),
        })
    }

    /// Hold every caller until `min_delay` has passed since the last request.
    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// GET `path` with `params` (plus `mailto`). `Ok(None)` on 404.
    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<Value>, ScholarError> {
        self.rate_limit().await;

        let url = format!("{}/{}", self.base_url, path);
        let mut req = self.http.get(&url).query(params);
        if let Some(ref email) = self.email {
            req = req.query(&[("mailto", email)]);
        }
        tracing::debug!(url = %url, "OpenAlex request");

        let resp = req
            .send()
            .await
            .map_err(|e| ScholarError::SourceUnavailable(format!("{url}: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScholarError::SourceUnavailable(format!(
                "{url}: rate limited (429)"
            )));
        }
        if status.is_server_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScholarError::SourceUnavailable(format!(
                "{url}: server error ({}): {body}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScholarError::InvalidArgument(format!(
                "{url}: request rejected ({}): {body}",
                status.as_u16()
            )));
        }
        resp.json::<Value>()
            .await
            .map(Some)
            .map_err(|e| ScholarError::Serialization(format!("{url}: {e}")))
    }

    fn cached(&self, id: &str) -> Option<Value> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
    }

    fn remember(&self, records: &[Value]) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        for record in records {
            if let Some(id) = record_id(record) {
                cache.insert(id, record.clone());
            }
        }
    }

    /// One record by id, from the cache or `/{kind}s/{id}`.
    async fn record(&self, id: &EntityId) -> Result<Option<Value>, ScholarError> {
        if let Some(hit) = self.cached(id.as_str()) {
            return Ok(Some(hit));
        }
        let kind = kind_of(id)?;
        let path = format!("{}/{}", endpoint(kind), id);
        let record = self.get_json(&path, &[]).await?;
        if let Some(ref r) = record {
            self.remember(std::slice::from_ref(r));
        }
        Ok(record)
    }

    /// Records for `ids` of one kind, in `ids` order; unknown ids are absent.
    pub async fn fetch_by_ids(
        &self,
        kind: EntityKind,
        ids: &[EntityId],
    ) -> Result<Vec<Value>, ScholarError> {
        let mut found: BTreeMap<String, Value> = BTreeMap::new();
        let mut missing: BTreeSet<&str> = BTreeSet::new();
        for id in ids {
            match self.cached(id.as_str()) {
                Some(hit) => {
                    found.insert(id.as_str().to_string(), hit);
                }
                None => {
                    missing.insert(id.as_str());
                }
            }
        }
        let missing: Vec<&str> = missing.into_iter().collect();

        for chunk in missing.chunks(ID_BATCH_SIZE) {
            let params = [
                ("filter", id_filter(kind, chunk)),
                ("per_page", chunk.len().to_string()),
            ];
            let Some(body) = self.get_json(endpoint(kind), &params).await? else {
                continue;
            };
            let (records, _) = parse_page(&body)?;
            tracing::debug!(
                kind = kind.as_str(),
                requested = chunk.len(),
                received = records.len(),
                "fetched records by id"
            );
            self.remember(&records);
            for record in records {
                if let Some(id) = record_id(&record) {
                    found.insert(id, record);
                }
            }
        }

        Ok(ids
            .iter()
            .filter_map(|id| found.get(id.as_str()).cloned())
            .collect())
    }
}

fn kind_of(id: &EntityId) -> Result<EntityKind, ScholarError> {
    id.kind_hint()
        .ok_or_else(|| ScholarError::InvalidArgument(format!("'{id}' is not an OpenAlex id")))
}

#[async_trait]
impl RecordSource for OpenAlexClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Value>, ScholarError> {
        let per_page = limit.clamp(1, MAX_PER_PAGE);
        let mut cursor = "*".to_string();
        let mut works: Vec<Value> = Vec::new();

        while works.len() < limit {
            let params = [
                ("search", query.to_string()),
                ("per_page", per_page.to_string()),
                ("cursor", cursor.clone()),
            ];
            let Some(body) = self.get_json("works", &params).await? else {
                break;
            };
            let (page, next) = parse_page(&body)?;
            if page.is_empty() {
                break;
            }
            self.remember(&page);
            works.extend(page);
            match next {
                Some(c) => cursor = c,
                None => break,
            }
        }

        works.truncate(limit);
        tracing::info!(query, found = works.len(), "OpenAlex search");
        Ok(works)
    }

    async fn fetch_related(
        &self,
        entity_id: &EntityId,
        relation: RelationKind,
    ) -> Result<Vec<Value>, ScholarError> {
        let Some(raw) = self.record(entity_id).await? else {
            tracing::debug!(id = %entity_id, "record not found upstream");
            return Ok(Vec::new());
        };
        let normalized = normalize(kind_of(entity_id)?, &raw, NormalizeOptions::default())?;
        let targets: Vec<EntityId> = normalized
            .refs
            .iter()
            .filter(|r| r.relation == relation)
            .map(|r| r.lookup_target().clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_by_ids(relation.lookup_kind(), &targets).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_uses_full_id_urls() {
        assert_eq!(
            id_filter(EntityKind::Author, &["A1", "A2"]),
            "openalex_id:https://openalex.org/A1|https://openalex.org/A2"
        );
        assert!(id_filter(EntityKind::Topic, &["T1"]).starts_with("openalex:"));
    }

    #[test]
    fn every_kind_has_an_endpoint() {
        let paths: BTreeSet<&str> = EntityKind::ALL.iter().map(|k| endpoint(*k)).collect();
        assert_eq!(paths.len(), EntityKind::ALL.len());
    }

    #[test]
    fn page_parsing() {
        let body = json!({
            "meta": { "count": 2, "next_cursor": "IlsxNjA5" },
            "results": [{ "id": "https://openalex.org/W1" }, { "id": "https://openalex.org/W2" }]
        });
        let (records, cursor) = parse_page(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(cursor.as_deref(), Some("IlsxNjA5"));

        let last = json!({ "meta": { "next_cursor": null }, "results": [] });
        assert_eq!(parse_page(&last).unwrap(), (Vec::new(), None));

        assert!(parse_page(&json!({ "error": "bad" })).is_err());
    }

    #[test]
    fn cache_evicts_oldest() {
        let mut cache = RecordCache::new(2);
        cache.insert("W1".into(), json!(1));
        cache.insert("W2".into(), json!(2));
        cache.insert("W1".into(), json!(10));
        cache.insert("W3".into(), json!(3));
        assert_eq!(cache.get("W1"), None);
        assert_eq!(cache.get("W2"), Some(json!(2)));
        assert_eq!(cache.get("W3"), Some(json!(3)));
    }

    #[test]
    fn record_ids_are_bare() {
        assert_eq!(
            record_id(&json!({ "id": "https://openalex.org/W42" })).as_deref(),
            Some("W42")
        );
        assert_eq!(record_id(&json!({ "title": "x" })), None);
    }

    #[tokio::test]
    async fn related_lookup_served_from_cache() {
        let config = OpenAlexConfig {
            // unroutable, so any network access would fail the test
            base_url: "http://127.0.0.1:9".to_string(),
            min_delay_ms: 0,
            ..OpenAlexConfig::default()
        };
        let client = OpenAlexClient::new(&config).unwrap();
        client.remember(&[
            json!({
                "id": "https://openalex.org/W1",
                "title": "Neural nets",
                "authorships": [{ "author": { "id": "https://openalex.org/A1" } }]
            }),
            json!({ "id": "https://openalex.org/A1", "display_name": "Ada Lovelace" }),
        ]);

        let authors = client
            .fetch_related(&EntityId::new("W1"), RelationKind::Authored)
            .await
            .unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0]["display_name"], "Ada Lovelace");

        let none = client
            .fetch_related(&EntityId::new("W1"), RelationKind::Cites)
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
