//! Similarity retrieval: embed the question, search the vector store.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::vector::{InclusionFilter, RetrievedCandidate, VectorStore};

pub struct SimilarityRetriever {
    embedding: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
}

impl SimilarityRetriever {
    pub fn new(embedding: Arc<dyn EmbeddingProvider>, vectors: Arc<dyn VectorStore>) -> Self {
        Self { embedding, vectors }
    }

    /// Top `k` excerpts for `query`, most similar first, as returned by the store.
    ///
    /// Embedding or search failures are logged and yield an empty list, so a
    /// broken index degrades to "no context" instead of failing the question.
    pub fn retrieve(
        &self,
        query: &str,
        k: usize,
        filter: Option<&InclusionFilter>,
    ) -> Vec<RetrievedCandidate> {
        if query.trim().is_empty() {
            tracing::warn!("retrieve called with empty query text");
            return Vec::new();
        }

        let vector = match self.embedding.embed_query(query) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "query embedding failed");
                return Vec::new();
            }
        };

        match self.vectors.search(&vector, k, filter) {
            Ok(candidates) => {
                tracing::info!(
                    k,
                    filtered = filter.is_some(),
                    candidates = candidates.len(),
                    "retrieval complete"
                );
                candidates
            }
            Err(e) => {
                tracing::error!(error = %e, "vector search failed");
                Vec::new()
            }
        }
    }
}
