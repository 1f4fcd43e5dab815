//! Corpus records as read from the relational store.
//!
//! [`Transcript`] is one recorded session, [`Excerpt`] one independently
//! embeddable span of it. Both are written by the ingestion pipeline and are
//! read-only to the query engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A transcript row, matching the `transcripts` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: i64,
    /// Upstream service label (e.g. `"limitless"`).
    pub source: String,
    /// Identifier assigned by the upstream service. Unique.
    pub source_id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// `true` once the chunker has written this transcript's excerpts.
    pub is_chunked: bool,
}

impl Transcript {
    /// Calendar day (UTC) the transcript started on.
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_time.map(|t| t.date_naive())
    }
}

/// An excerpt row, matching the `excerpts` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excerpt {
    pub id: i64,
    pub transcript_id: i64,
    pub content: String,
    /// Seconds from the owning transcript's start.
    pub start_offset: Option<f64>,
    pub end_offset: Option<f64>,
    /// `true` once a vector for this excerpt is in the vector store.
    pub is_embedded: bool,
}

/// Input for [`crate::store::sqlite::insert_transcript`].
#[derive(Debug, Clone, Default)]
pub struct NewTranscript {
    pub source: String,
    pub source_id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Input for [`crate::store::sqlite::insert_excerpt`].
#[derive(Debug, Clone, Default)]
pub struct NewExcerpt {
    pub transcript_id: i64,
    pub content: String,
    pub start_offset: Option<f64>,
    pub end_offset: Option<f64>,
}

/// Row counts for the doctor report and the ingestion side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusSummary {
    pub transcripts: u64,
    pub chunked_transcripts: u64,
    pub excerpts: u64,
    pub embedded_excerpts: u64,
}
