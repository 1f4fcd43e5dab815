//! Vector similarity store.
//!
//! Defines the [`VectorStore`] trait, the typed [`RetrievedCandidate`] record it
//! returns, and the [`InclusionFilter`] used for temporal scoping. The sqlite-vec
//! implementation lives in [`sqlite_vec`].

pub mod sqlite_vec;

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::types::Excerpt;

/// One excerpt returned by similarity search or injected by recency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedCandidate {
    /// Excerpt id in the relational store.
    pub id: i64,
    pub content: String,
    pub transcript_id: i64,
    /// Absolute start of the owning transcript, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_start: Option<DateTime<Utc>>,
}

impl RetrievedCandidate {
    pub fn from_excerpt(excerpt: &Excerpt, transcript_start: Option<DateTime<Utc>>) -> Self {
        Self {
            id: excerpt.id,
            content: excerpt.content.clone(),
            transcript_id: excerpt.transcript_id,
            transcript_start,
        }
    }
}

/// Restricts search to excerpts whose owning transcript is in a fixed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionFilter {
    transcript_ids: BTreeSet<i64>,
}

impl InclusionFilter {
    /// Returns `None` for an empty set: an empty filter would match nothing,
    /// which callers treat as "no restriction" instead.
    pub fn for_transcripts(ids: impl IntoIterator<Item = i64>) -> Option<Self> {
        let transcript_ids: BTreeSet<i64> = ids.into_iter().collect();
        if transcript_ids.is_empty() {
            None
        } else {
            Some(Self { transcript_ids })
        }
    }

    pub fn contains(&self, transcript_id: i64) -> bool {
        self.transcript_ids.contains(&transcript_id)
    }

    pub fn transcript_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.transcript_ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.transcript_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript_ids.is_empty()
    }
}

/// Nearest-neighbour search over excerpt embeddings.
///
/// All methods are synchronous; callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait VectorStore: Send + Sync {
    /// Up to `k` excerpts nearest to `vector`, most similar first.
    fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&InclusionFilter>,
    ) -> Result<Vec<RetrievedCandidate>>;

    /// Store one vector per excerpt. `excerpts` and `vectors` must be the same length.
    fn add(&self, excerpts: &[Excerpt], vectors: &[Vec<f32>]) -> Result<()>;
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}
