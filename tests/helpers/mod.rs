#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use lifelog_recall::db::{self, SharedConnection};
use lifelog_recall::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use lifelog_recall::generation::{GenerationError, Generator};
use lifelog_recall::store::sqlite::{insert_excerpt, insert_transcript};
use lifelog_recall::store::types::{Excerpt, NewExcerpt, NewTranscript};
use lifelog_recall::tokens::TokenCounter;
use lifelog_recall::vector::sqlite_vec::SqliteVecStore;
use lifelog_recall::vector::{InclusionFilter, RetrievedCandidate, VectorStore};
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

pub fn shared_db() -> SharedConnection {
    db::share(test_db())
}

/// Generate a deterministic 384-dim embedding with a spike at position `seed`.
/// Each seed produces a distinct, orthogonal vector.
pub fn test_embedding(seed: u8) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed as usize % EMBEDDING_DIM] = 1.0;
    v
}

/// Unit vector mostly along `primary`, leaning a little towards `secondary`.
pub fn blended_embedding(primary: u8, secondary: u8, weight: f32) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[primary as usize % EMBEDDING_DIM] = 1.0;
    v[secondary as usize % EMBEDDING_DIM] += weight;
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut v {
        *x /= norm;
    }
    v
}

/// The fixed "today" used by engine tests.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
}

pub fn at(day: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(hour, minute, 0).unwrap())
}

/// Insert a transcript running from `start` for `minutes`. Returns its id.
pub fn add_transcript(conn: &Connection, source_id: &str, start: DateTime<Utc>, minutes: i64) -> i64 {
    insert_transcript(
        conn,
        &NewTranscript {
            source: "limitless".into(),
            source_id: source_id.into(),
            title: Some(format!("Recording {source_id}")),
            content: None,
            start_time: Some(start),
            end_time: Some(start + chrono::Duration::minutes(minutes)),
        },
    )
    .unwrap()
}

/// Insert an excerpt and return it as stored.
pub fn add_excerpt(conn: &Connection, transcript_id: i64, content: &str) -> Excerpt {
    let id = insert_excerpt(
        conn,
        &NewExcerpt {
            transcript_id,
            content: content.into(),
            ..Default::default()
        },
    )
    .unwrap();
    Excerpt {
        id,
        transcript_id,
        content: content.into(),
        start_offset: None,
        end_offset: None,
        is_embedded: false,
    }
}

/// Store one vector per excerpt through the sqlite-vec store.
pub fn embed(conn: &SharedConnection, excerpts: &[(Excerpt, Vec<f32>)]) {
    let store = SqliteVecStore::new(Arc::clone(conn));
    let (rows, vectors): (Vec<Excerpt>, Vec<Vec<f32>>) = excerpts.iter().cloned().unzip();
    store.add(&rows, &vectors).unwrap();
}

/// `count` distinct words.
pub fn words(count: usize) -> String {
    (0..count).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

/// One token per whitespace-separated word.
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Embedding provider with scripted vectors and a call counter.
#[derive(Default)]
pub struct FakeEmbedding {
    vectors: HashMap<String, Vec<f32>>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeEmbedding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn failing() -> Self {
        let fake = Self::default();
        fake.fail.store(true, Ordering::SeqCst);
        fake
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for FakeEmbedding {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(!self.fail.load(Ordering::SeqCst), "embedding model unavailable");
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| test_embedding(0)))
    }
}

/// Vector store that returns a fixed result list, truncated to `k`.
#[derive(Default)]
pub struct ScriptedVectorStore {
    results: Vec<RetrievedCandidate>,
    pub calls: AtomicUsize,
    pub last_filter: Mutex<Option<InclusionFilter>>,
    pub fail: AtomicBool,
}

impl ScriptedVectorStore {
    pub fn returning(results: Vec<RetrievedCandidate>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VectorStore for ScriptedVectorStore {
    fn search(
        &self,
        _vector: &[f32],
        k: usize,
        filter: Option<&InclusionFilter>,
    ) -> Result<Vec<RetrievedCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = filter.cloned();
        anyhow::ensure!(!self.fail.load(Ordering::SeqCst), "vector index unavailable");
        Ok(self.results.iter().take(k).cloned().collect())
    }

    fn add(&self, _excerpts: &[Excerpt], _vectors: &[Vec<f32>]) -> Result<()> {
        Ok(())
    }
}

/// Generator that records every prompt it receives.
pub struct FakeGenerator {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let fake = Self::replying("");
        fake.fail.store(true, Ordering::SeqCst);
        fake
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl Generator for FakeGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(GenerationError::Status {
                status: 500,
                body: "model crashed".into(),
            });
        }
        Ok(self.reply.clone())
    }
}
