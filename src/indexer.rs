//! Index building and the process-wide index cache.
//!
//! [`build_index`] runs the whole pipeline: load documents → split into
//! chunks → embed → build the [`VectorIndex`]. [`IndexCache`] makes sure
//! that pipeline runs at most once per process and shares the result
//! read-only with every request.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;

use crate::chunk::split_pages;
use crate::config::Config;
use crate::embedding::{embed_in_batches, EmbeddingProvider};
use crate::loader::load_documents;
use crate::store::VectorIndex;

/// Load, split, embed and index every configured document.
pub async fn build_index(config: &Config, embedder: &dyn EmbeddingProvider) -> Result<VectorIndex> {
    let start = Instant::now();

    // PDF parsing is CPU-bound; keep it off the async workers.
    let documents = config.documents.clone();
    let pages = tokio::task::spawn_blocking(move || load_documents(&documents)).await??;
    let chunks = split_pages(
        &pages,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );
    if chunks.is_empty() {
        anyhow::bail!(
            "Documents in {} contain no extractable text",
            config.documents.dir.display()
        );
    }
    tracing::info!(
        pages = pages.len(),
        chunks = chunks.len(),
        "split documents, embedding with {}",
        embedder.model_name()
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embed_in_batches(embedder, &texts, config.embedding.batch_size)
        .await
        .context("Embedding chunks failed")?;

    let index = VectorIndex::build(chunks, vectors)?;
    tracing::info!(
        chunks = index.len(),
        sources = index.source_count(),
        dims = index.dims(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "index ready"
    );
    Ok(index)
}

/// Lifecycle of the shared index.
#[derive(Clone)]
pub enum IndexState {
    NotBuilt,
    Building,
    Ready(Arc<VectorIndex>),
    /// The build failed; the message is shown to users. Not retried.
    Failed(String),
}

/// Build-once holder for the [`VectorIndex`].
///
/// The check-then-build sequence runs under an async mutex, so concurrent
/// callers wait for the single build instead of starting their own. Both
/// outcomes are kept: a failed build stays failed until [`IndexCache::clear`]
/// is called.
pub struct IndexCache {
    state: RwLock<IndexState>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexCache {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IndexState::NotBuilt),
            build_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Current state, without waiting for a build in progress.
    pub fn state(&self) -> IndexState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// How many times a builder has been run.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Return the cached index, running `build` only if nothing is cached.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Result<Arc<VectorIndex>, String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<VectorIndex>>,
    {
        let _guard = self.build_lock.lock().await;

        match self.state() {
            IndexState::Ready(index) => return Ok(index),
            IndexState::Failed(message) => return Err(message),
            IndexState::NotBuilt | IndexState::Building => {}
        }

        self.set_state(IndexState::Building);
        self.builds.fetch_add(1, Ordering::SeqCst);

        match build().await {
            Ok(index) => {
                let index = Arc::new(index);
                self.set_state(IndexState::Ready(index.clone()));
                Ok(index)
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!("index build failed: {}", message);
                self.set_state(IndexState::Failed(message.clone()));
                Err(message)
            }
        }
    }

    /// Drop the cached index (or cached failure); the next
    /// [`get_or_build`](Self::get_or_build) rebuilds from scratch.
    pub async fn clear(&self) {
        let _guard = self.build_lock.lock().await;
        self.set_state(IndexState::NotBuilt);
        tracing::info!("index cache cleared");
    }

    fn set_state(&self, next: IndexState) {
        match self.state.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn tiny_index() -> VectorIndex {
        let chunk = Chunk {
            id: "c1".to_string(),
            source: "data/spo.pdf".to_string(),
            page: Some(1),
            chunk_index: 0,
            text: "Die Bachelorarbeit umfasst 12 LP.".to_string(),
            hash: String::new(),
        };
        VectorIndex::build(vec![chunk], vec![vec![1.0, 0.0]]).unwrap()
    }

    #[tokio::test]
    async fn builds_exactly_once() {
        let cache = IndexCache::new();
        for _ in 0..5 {
            let index = cache.get_or_build(|| async { Ok(tiny_index()) }).await.unwrap();
            assert_eq!(index.len(), 1);
        }
        assert_eq!(cache.build_count(), 1);
        assert!(matches!(cache.state(), IndexState::Ready(_)));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_build() {
        let cache = Arc::new(IndexCache::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_build(|| async {
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(tiny_index())
                    })
                    .await
                    .is_ok()
            }));
        }
        for h in handles {
            assert!(h.await.unwrap());
        }
        assert_eq!(cache.build_count(), 1);
    }

    #[tokio::test]
    async fn failure_is_cached_not_retried() {
        let cache = IndexCache::new();
        let first = cache
            .get_or_build(|| async { Err(anyhow::anyhow!("no documents")) })
            .await;
        assert_eq!(first.unwrap_err(), "no documents");

        let second = cache.get_or_build(|| async { Ok(tiny_index()) }).await;
        assert!(second.is_err());
        assert_eq!(cache.build_count(), 1);
        assert!(matches!(cache.state(), IndexState::Failed(_)));
    }

    #[tokio::test]
    async fn clear_allows_explicit_rebuild() {
        let cache = IndexCache::new();
        let _ = cache
            .get_or_build(|| async { Err(anyhow::anyhow!("embedding service down")) })
            .await;
        cache.clear().await;
        assert!(matches!(cache.state(), IndexState::NotBuilt));

        let index = cache.get_or_build(|| async { Ok(tiny_index()) }).await;
        assert!(index.is_ok());
        assert_eq!(cache.build_count(), 2);
    }
}
