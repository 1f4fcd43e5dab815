//! SQL DDL for the transcript corpus.
//!
//! Defines `transcripts`, `excerpts`, `schema_meta` and the `excerpts_vec` (vec0)
//! table. All DDL uses `IF NOT EXISTS` for idempotent initialization.
//!
//! Timestamps are RFC 3339 UTC strings with a `Z` suffix, so lexical comparison
//! in SQL matches chronological order.

use rusqlite::Connection;

use crate::embedding::EMBEDDING_DIM;

const SCHEMA_SQL: &str = r#"
-- One continuous recorded session
CREATE TABLE IF NOT EXISTS transcripts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source TEXT NOT NULL,
    source_id TEXT NOT NULL UNIQUE,
    title TEXT,
    content TEXT,
    start_time TEXT,
    end_time TEXT,
    is_chunked INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transcripts_start ON transcripts(start_time);

-- Independently retrievable spans of a transcript
CREATE TABLE IF NOT EXISTS excerpts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transcript_id INTEGER NOT NULL REFERENCES transcripts(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    start_offset REAL,
    end_offset REAL,
    is_embedded INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_excerpts_transcript ON excerpts(transcript_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // vec0 rows are keyed by the excerpt id through the implicit rowid.
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS excerpts_vec USING vec0(embedding FLOAT[{EMBEDDING_DIM}]);"
    ))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
