//! In-memory vector index.
//!
//! Holds every chunk together with its embedding. The index is built in one
//! step and never modified afterwards; rebuilding means constructing a new
//! [`VectorIndex`]. Search is brute-force cosine similarity over all vectors.

use anyhow::{bail, Result};

use crate::embedding::cosine_similarity;
use crate::models::Chunk;

#[derive(Debug)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<Entry>,
    dims: usize,
}

impl VectorIndex {
    /// Pair chunks with their vectors.
    ///
    /// Fails on empty input, on a count mismatch, or when the vectors do not
    /// all share one dimension.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.is_empty() {
            bail!("Cannot build an index without chunks");
        }
        if chunks.len() != vectors.len() {
            bail!(
                "Chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }

        let dims = vectors[0].len();
        if dims == 0 {
            bail!("Embedding vectors are empty");
        }
        if let Some(pos) = vectors.iter().position(|v| v.len() != dims) {
            bail!(
                "Inconsistent embedding dimensions: vector {} has {} dims, expected {}",
                pos,
                vectors[pos].len(),
                dims
            );
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| Entry { chunk, vector })
            .collect();

        Ok(Self { entries, dims })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of distinct source documents in the index.
    pub fn source_count(&self) -> usize {
        let mut sources: Vec<&str> = self.entries.iter().map(|e| e.chunk.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        sources.len()
    }

    /// The `k` chunks most similar to `query`, best first.
    ///
    /// Ties keep index order.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dims {
            bail!(
                "Query vector has {} dims, index has {}",
                query.len(),
                self.dims
            );
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, text: &str) -> Chunk {
        Chunk {
            id: text.to_string(),
            source: source.to_string(),
            page: Some(1),
            chunk_index: 0,
            text: text.to_string(),
            hash: String::new(),
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::build(
            vec![
                chunk("a.pdf", "north"),
                chunk("a.pdf", "east"),
                chunk("b.pdf", "north-east"),
                chunk("b.pdf", "south"),
            ],
            vec![
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
                vec![0.0, -1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn nearest_first() {
        let index = sample_index();
        let hits = index.similarity_search(&[0.1, 1.0], 2).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["north", "north-east"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn k_larger_than_index_returns_all() {
        let index = sample_index();
        assert_eq!(index.similarity_search(&[1.0, 0.0], 10).unwrap().len(), 4);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = VectorIndex::build(
            vec![chunk("a.pdf", "first"), chunk("a.pdf", "second")],
            vec![vec![1.0, 0.0], vec![2.0, 0.0]],
        )
        .unwrap();
        let hits = index.similarity_search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].chunk.text, "first");
    }

    #[test]
    fn build_rejects_bad_input() {
        assert!(VectorIndex::build(vec![], vec![]).is_err());
        assert!(VectorIndex::build(vec![chunk("a", "x")], vec![]).is_err());
        assert!(VectorIndex::build(
            vec![chunk("a", "x"), chunk("a", "y")],
            vec![vec![1.0, 0.0], vec![1.0]]
        )
        .is_err());
    }

    #[test]
    fn query_dimension_must_match() {
        let index = sample_index();
        assert!(index.similarity_search(&[1.0, 0.0, 0.0], 2).is_err());
    }

    #[test]
    fn counts() {
        let index = sample_index();
        assert_eq!(index.len(), 4);
        assert_eq!(index.dims(), 2);
        assert_eq!(index.source_count(), 2);
    }
}
