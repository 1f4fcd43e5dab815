//! SQLite implementation of [`TranscriptStore`] plus the write path used by
//! ingestion.
//!
//! Functions take a plain `&Connection` so they compose inside transactions;
//! [`SqliteTranscriptStore`] wraps them behind the shared connection lock.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::types::{CorpusSummary, Excerpt, NewExcerpt, NewTranscript, Transcript};
use super::{format_timestamp, parse_timestamp, TranscriptStore};
use crate::db::{self, SharedConnection};

/// [`TranscriptStore`] over the shared SQLite connection.
#[derive(Clone)]
pub struct SqliteTranscriptStore {
    conn: SharedConnection,
}

impl SqliteTranscriptStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl TranscriptStore for SqliteTranscriptStore {
    fn transcript_ids_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let conn = db::lock(&self.conn)?;
        transcript_ids_overlapping(&conn, start, end)
    }

    fn excerpts_of_transcript(&self, transcript_id: i64) -> Result<Vec<Excerpt>> {
        let conn = db::lock(&self.conn)?;
        excerpts_of_transcript(&conn, transcript_id)
    }

    fn transcript_by_id(&self, id: i64) -> Result<Option<Transcript>> {
        let conn = db::lock(&self.conn)?;
        transcript_by_id(&conn, id)
    }

    fn distinct_transcript_dates(&self) -> Result<Vec<NaiveDate>> {
        let conn = db::lock(&self.conn)?;
        distinct_transcript_dates(&conn)
    }
}

// ── Read path ─────────────────────────────────────────────────────────────────

const TRANSCRIPT_COLUMNS: &str =
    "id, source, source_id, title, content, start_time, end_time, is_chunked";

/// Raw row; timestamps are parsed after the statement finishes.
struct TranscriptRow {
    id: i64,
    source: String,
    source_id: String,
    title: Option<String>,
    content: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    is_chunked: bool,
}

impl TranscriptRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source: row.get(1)?,
            source_id: row.get(2)?,
            title: row.get(3)?,
            content: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            is_chunked: row.get(7)?,
        })
    }

    fn into_transcript(self) -> Result<Transcript> {
        Ok(Transcript {
            id: self.id,
            source: self.source,
            source_id: self.source_id,
            title: self.title,
            content: self.content,
            start_time: self.start_time.as_deref().map(parse_timestamp).transpose()?,
            end_time: self.end_time.as_deref().map(parse_timestamp).transpose()?,
            is_chunked: self.is_chunked,
        })
    }
}

/// A transcript overlaps `[start, end)` when it starts before `end` and ends
/// after `start`. Its own end is exclusive, so a session ending exactly at
/// `start` does not count. A missing end time means the transcript is a point
/// at its start time, and a point at `start` does count.
pub fn transcript_ids_overlapping(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT id FROM transcripts \
         WHERE start_time IS NOT NULL \
           AND start_time < ?2 \
           AND (end_time > ?1 OR (end_time IS NULL AND start_time >= ?1)) \
         ORDER BY start_time, id",
    )?;
    let ids = stmt
        .query_map(
            params![format_timestamp(&start), format_timestamp(&end)],
            |row| row.get::<_, i64>(0),
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub fn excerpts_of_transcript(conn: &Connection, transcript_id: i64) -> Result<Vec<Excerpt>> {
    let mut stmt = conn.prepare(
        "SELECT id, transcript_id, content, start_offset, end_offset, is_embedded \
         FROM excerpts WHERE transcript_id = ?1 ORDER BY id",
    )?;
    let excerpts = stmt
        .query_map(params![transcript_id], |row| {
            Ok(Excerpt {
                id: row.get(0)?,
                transcript_id: row.get(1)?,
                content: row.get(2)?,
                start_offset: row.get(3)?,
                end_offset: row.get(4)?,
                is_embedded: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(excerpts)
}

pub fn transcript_by_id(conn: &Connection, id: i64) -> Result<Option<Transcript>> {
    let row = conn
        .query_row(
            &format!("SELECT {TRANSCRIPT_COLUMNS} FROM transcripts WHERE id = ?1"),
            params![id],
            TranscriptRow::from_row,
        )
        .optional()?;
    row.map(TranscriptRow::into_transcript).transpose()
}

pub fn transcript_by_source_id(conn: &Connection, source_id: &str) -> Result<Option<Transcript>> {
    let row = conn
        .query_row(
            &format!("SELECT {TRANSCRIPT_COLUMNS} FROM transcripts WHERE source_id = ?1"),
            params![source_id],
            TranscriptRow::from_row,
        )
        .optional()?;
    row.map(TranscriptRow::into_transcript).transpose()
}

pub fn distinct_transcript_dates(conn: &Connection) -> Result<Vec<NaiveDate>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT substr(start_time, 1, 10) AS day FROM transcripts \
         WHERE start_time IS NOT NULL ORDER BY day",
    )?;
    let days = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    days.iter()
        .map(|day| {
            NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .with_context(|| format!("invalid stored date: {day}"))
        })
        .collect()
}

/// Start time of the most recently started transcript.
pub fn latest_transcript_start(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
    let latest: Option<String> =
        conn.query_row("SELECT MAX(start_time) FROM transcripts", [], |row| row.get(0))?;
    latest.as_deref().map(parse_timestamp).transpose()
}

pub fn corpus_summary(conn: &Connection) -> Result<CorpusSummary> {
    let count = |sql: &str| -> Result<u64> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    };
    Ok(CorpusSummary {
        transcripts: count("SELECT COUNT(*) FROM transcripts")?,
        chunked_transcripts: count("SELECT COUNT(*) FROM transcripts WHERE is_chunked = 1")?,
        excerpts: count("SELECT COUNT(*) FROM excerpts")?,
        embedded_excerpts: count("SELECT COUNT(*) FROM excerpts WHERE is_embedded = 1")?,
    })
}

// ── Write path ────────────────────────────────────────────────────────────────

/// Insert a transcript. Fails if `source_id` already exists.
pub fn insert_transcript(conn: &Connection, transcript: &NewTranscript) -> Result<i64> {
    let now = format_timestamp(&Utc::now());
    conn.execute(
        "INSERT INTO transcripts (source, source_id, title, content, start_time, end_time, \
         is_chunked, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)",
        params![
            transcript.source,
            transcript.source_id,
            transcript.title,
            transcript.content,
            transcript.start_time.as_ref().map(format_timestamp),
            transcript.end_time.as_ref().map(format_timestamp),
            now,
        ],
    )
    .with_context(|| format!("failed to insert transcript {}", transcript.source_id))?;

    let id = conn.last_insert_rowid();
    tracing::debug!(id, source_id = %transcript.source_id, "transcript inserted");
    Ok(id)
}

pub fn insert_excerpt(conn: &Connection, excerpt: &NewExcerpt) -> Result<i64> {
    conn.execute(
        "INSERT INTO excerpts (transcript_id, content, start_offset, end_offset, is_embedded, created_at) \
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            excerpt.transcript_id,
            excerpt.content,
            excerpt.start_offset,
            excerpt.end_offset,
            format_timestamp(&Utc::now()),
        ],
    )
    .with_context(|| format!("failed to insert excerpt for transcript {}", excerpt.transcript_id))?;
    Ok(conn.last_insert_rowid())
}

pub fn mark_chunked(conn: &Connection, transcript_id: i64) -> Result<()> {
    let updated = conn.execute(
        "UPDATE transcripts SET is_chunked = 1, updated_at = ?1 WHERE id = ?2",
        params![format_timestamp(&Utc::now()), transcript_id],
    )?;
    anyhow::ensure!(updated == 1, "transcript not found: {transcript_id}");
    Ok(())
}
