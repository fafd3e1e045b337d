//! Embedding provider abstraction and the OpenAI implementation.
//!
//! Defines the [`EmbeddingProvider`] trait, the [`OpenAIEmbeddings`]
//! backend that calls `POST {base_url}/embeddings`, batching helpers, and
//! [`cosine_similarity`] for comparing vectors.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::Config;
use crate::openai::OpenAIClient;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-ada-002"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per text in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let results = provider.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Embed many texts, `batch_size` per provider call.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());
    for (i, batch) in texts.chunks(batch_size.max(1)).enumerate() {
        let embedded = provider.embed(batch).await?;
        if embedded.len() != batch.len() {
            bail!(
                "Embedding batch {} returned {} vectors for {} texts",
                i,
                embedded.len(),
                batch.len()
            );
        }
        tracing::debug!(batch = i, size = batch.len(), "embedded batch");
        vectors.extend(embedded);
    }
    Ok(vectors)
}

// ============ OpenAI Provider ============

/// Embedding provider backed by the OpenAI embeddings endpoint.
pub struct OpenAIEmbeddings {
    client: OpenAIClient,
    model: String,
    max_retries: u32,
}

impl OpenAIEmbeddings {
    pub fn new(config: &Config, api_key: &str) -> Result<Self> {
        let client = OpenAIClient::new(
            &config.openai.base_url,
            api_key,
            Duration::from_secs(config.embedding.timeout_secs),
        )?;
        Ok(Self {
            client,
            model: config.embedding.model.clone(),
            max_retries: config.embedding.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self
            .client
            .post_json("embeddings", &body, self.max_retries)
            .await?;
        parse_openai_response(&json)
    }
}

/// Parse the embeddings response.
///
/// Extracts `data[].embedding` and orders the vectors by `data[].index`
/// so they line up with the request input.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());

    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, and zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            "counting"
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    #[test]
    fn response_is_reordered_by_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn response_without_data_is_error() {
        let json = serde_json::json!({ "error": { "message": "nope" } });
        assert!(parse_openai_response(&json).is_err());
    }

    #[tokio::test]
    async fn batches_are_split_and_concatenated_in_order() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let texts: Vec<String> = (0..5).map(|i| "x".repeat(i + 1)).collect();
        let vectors = embed_in_batches(&provider, &texts, 2).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn embed_query_returns_single_vector() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let v = embed_query(&provider, "abc").await.unwrap();
        assert_eq!(v, vec![3.0, 1.0]);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
