//! Relational transcript store.
//!
//! [`TranscriptStore`] is the narrow read interface the query engine consumes;
//! [`sqlite::SqliteTranscriptStore`] implements it over the shared SQLite
//! connection. The write helpers in [`sqlite`] exist for the ingestion side and
//! for tests.

pub mod sqlite;
pub mod types;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use types::{Excerpt, Transcript};

/// Read access to transcripts and their excerpts.
///
/// All methods are synchronous; async callers should use
/// `tokio::task::spawn_blocking`.
pub trait TranscriptStore: Send + Sync {
    /// Ids of transcripts whose time range overlaps the half-open window `[start, end)`.
    fn transcript_ids_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<i64>>;

    /// Every excerpt of one transcript, in storage order.
    fn excerpts_of_transcript(&self, transcript_id: i64) -> Result<Vec<Excerpt>>;

    fn transcript_by_id(&self, id: i64) -> Result<Option<Transcript>>;

    /// Distinct UTC start dates across all transcripts, ascending.
    fn distinct_transcript_dates(&self) -> Result<Vec<NaiveDate>>;
}

/// Render a timestamp the way it is stored: RFC 3339, whole seconds, `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid stored timestamp: {raw}"))?;
    Ok(parsed.with_timezone(&Utc))
}
