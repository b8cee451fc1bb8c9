//! # HTTP Embedder
//!
//! [`EmbeddingGenerator`] backed by an OpenAI-compatible `/embeddings`
//! endpoint (OpenAI itself, a local text-embeddings server, ...).

use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use reqwest::Client;
use scholargraph_core::{EmbeddingGenerator, ScholarError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Vectors of a response body, in request order.
///
/// Fails unless there is exactly one vector of `dimension` floats per input.
pub fn parse_embeddings(
    body: &str,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, ScholarError> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| ScholarError::Embedding(format!("unreadable embedding response: {e}")))?;

    let mut data = response.data;
    data.sort_by_key(|d| d.index);
    if data.len() != expected {
        return Err(ScholarError::Embedding(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }
    if let Some(bad) = data.iter().find(|d| d.embedding.len() != dimension) {
        return Err(ScholarError::Embedding(format!(
            "embedding {} has dimension {}, expected {dimension}",
            bad.index,
            bad.embedding.len()
        )));
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl HttpEmbedder {
    /// `None` when no endpoint is configured.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Option<Self>, ScholarError> {
        let Some(url) = config.url.as_deref() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScholarError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Some(Self {
            client,
            endpoint: format!("{}/embeddings", url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size.max(1),
        }))
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScholarError> {
        let mut req = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ScholarError::Embedding(format!("{}: {e}", self.endpoint)))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ScholarError::Embedding(format!("{}: {e}", self.endpoint)))?;
        if !status.is_success() {
            return Err(ScholarError::Embedding(format!(
                "{} returned {}: {}",
                self.endpoint,
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }
        parse_embeddings(&body, texts.len(), self.dimension)
    }
}

#[async_trait]
impl EmbeddingGenerator for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ScholarError> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ScholarError::Embedding("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ScholarError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.request(chunk).await?);
        }
        tracing::debug!(texts = texts.len(), model = %self.model, "embedded batch");
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn vectors_follow_index_order() {
        let body = r#"{
            "object": "list",
            "data": [
                { "object": "embedding", "index": 1, "embedding": [0.0, 1.0] },
                { "object": "embedding", "index": 0, "embedding": [1.0, 0.0] }
            ],
            "model": "all-MiniLM-L6-v2"
        }"#;
        let vectors = parse_embeddings(body, 2, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn wrong_count_or_dimension_rejected() {
        let body = r#"{ "data": [{ "index": 0, "embedding": [1.0, 0.0] }] }"#;
        assert!(matches!(
            parse_embeddings(body, 2, 2),
            Err(ScholarError::Embedding(_))
        ));
        assert!(matches!(
            parse_embeddings(body, 1, 3),
            Err(ScholarError::Embedding(_))
        ));
        assert!(parse_embeddings("not json", 1, 2).is_err());
    }

    #[test]
    fn no_url_means_no_embedder() {
        let config = EmbeddingConfig::default();
        assert!(HttpEmbedder::from_config(&config).unwrap().is_none());

        let config = EmbeddingConfig {
            url: Some("http://localhost:8000/v1/".to_string()),
            dimension: 8,
            ..EmbeddingConfig::default()
        };
        let embedder = HttpEmbedder::from_config(&config).unwrap().unwrap();
        assert_eq!(embedder.endpoint, "http://localhost:8000/v1/embeddings");
        assert_eq!(embedder.dimension(), 8);
        assert_eq!(embedder.model_name(), "all-MiniLM-L6-v2");
    }
}
