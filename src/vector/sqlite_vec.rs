//! sqlite-vec implementation of [`VectorStore`].
//!
//! Vectors live in the `excerpts_vec` vec0 table keyed by excerpt id (rowid).
//! Unfiltered search uses the vec0 KNN index; filtered search scans only the
//! excerpts of the allowed transcripts and ranks them with `vec_distance_l2`.
//! Vectors are L2-normalized, so L2 order equals cosine order.

use std::collections::HashMap;

use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};

use super::{embedding_to_bytes, InclusionFilter, RetrievedCandidate, VectorStore};
use crate::db::{self, SharedConnection};
use crate::embedding::EMBEDDING_DIM;
use crate::store::parse_timestamp;
use crate::store::types::Excerpt;

/// [`VectorStore`] sharing the transcript database connection.
#[derive(Clone)]
pub struct SqliteVecStore {
    conn: SharedConnection,
}

impl SqliteVecStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl VectorStore for SqliteVecStore {
    fn search(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&InclusionFilter>,
    ) -> Result<Vec<RetrievedCandidate>> {
        ensure!(
            vector.len() == EMBEDDING_DIM,
            "query vector has {} dimensions, expected {EMBEDDING_DIM}",
            vector.len()
        );
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = db::lock(&self.conn)?;
        let ranked = match filter {
            Some(filter) => filtered_knn(&conn, vector, k, filter)?,
            None => knn(&conn, vector, k)?,
        };
        hydrate(&conn, &ranked)
    }

    fn add(&self, excerpts: &[Excerpt], vectors: &[Vec<f32>]) -> Result<()> {
        ensure!(
            excerpts.len() == vectors.len(),
            "number of excerpts ({}) and vectors ({}) must be equal",
            excerpts.len(),
            vectors.len()
        );
        if excerpts.is_empty() {
            return Ok(());
        }

        let mut conn = db::lock(&self.conn)?;
        let tx = conn.transaction()?;
        for (excerpt, vector) in excerpts.iter().zip(vectors) {
            ensure!(
                vector.len() == EMBEDDING_DIM,
                "vector for excerpt {} has {} dimensions, expected {EMBEDDING_DIM}",
                excerpt.id,
                vector.len()
            );
            // vec0 has no upsert.
            tx.execute("DELETE FROM excerpts_vec WHERE rowid = ?1", params![excerpt.id])?;
            tx.execute(
                "INSERT INTO excerpts_vec (rowid, embedding) VALUES (?1, ?2)",
                params![excerpt.id, embedding_to_bytes(vector)],
            )?;
            tx.execute(
                "UPDATE excerpts SET is_embedded = 1 WHERE id = ?1",
                params![excerpt.id],
            )?;
        }
        tx.commit()?;

        tracing::debug!(count = excerpts.len(), "excerpt vectors stored");
        Ok(())
    }
}

/// Vector KNN search via the vec0 index. Returns (excerpt id, distance).
fn knn(conn: &Connection, vector: &[f32], k: usize) -> Result<Vec<(i64, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT rowid, distance FROM excerpts_vec \
         WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
    )?;
    let results = stmt
        .query_map(params![embedding_to_bytes(vector), k as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

/// Exact search restricted to excerpts of the filter's transcripts.
fn filtered_knn(
    conn: &Connection,
    vector: &[f32],
    k: usize,
    filter: &InclusionFilter,
) -> Result<Vec<(i64, f64)>> {
    let ids: Vec<i64> = filter.transcript_ids().collect();
    // ?1 is the query vector, ?2 the limit, transcript ids follow.
    let placeholders: Vec<String> = (3..3 + ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT v.rowid, vec_distance_l2(v.embedding, ?1) AS distance \
         FROM excerpts_vec v JOIN excerpts e ON e.id = v.rowid \
         WHERE e.transcript_id IN ({}) \
         ORDER BY distance, v.rowid LIMIT ?2",
        placeholders.join(", ")
    );

    let bytes = embedding_to_bytes(vector);
    let limit = k as i64;
    let mut bound: Vec<&dyn rusqlite::types::ToSql> = vec![&bytes, &limit];
    bound.extend(ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));

    let mut stmt = conn.prepare(&sql)?;
    let results = stmt
        .query_map(bound.as_slice(), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(results)
}

/// Join ranked ids back to excerpt text and transcript start, preserving rank.
/// Vectors whose excerpt row is gone are dropped.
fn hydrate(conn: &Connection, ranked: &[(i64, f64)]) -> Result<Vec<RetrievedCandidate>> {
    if ranked.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (1..=ranked.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT e.id, e.content, e.transcript_id, t.start_time \
         FROM excerpts e JOIN transcripts t ON t.id = e.transcript_id \
         WHERE e.id IN ({})",
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(ranked.iter().map(|(id, _)| id)), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_id: HashMap<i64, RetrievedCandidate> = HashMap::with_capacity(rows.len());
    for (id, content, transcript_id, start) in rows {
        let transcript_start: Option<DateTime<Utc>> =
            start.as_deref().map(parse_timestamp).transpose()?;
        by_id.insert(
            id,
            RetrievedCandidate {
                id,
                content,
                transcript_id,
                transcript_start,
            },
        );
    }

    Ok(ranked
        .iter()
        .filter_map(|(id, _distance)| by_id.remove(id))
        .collect())
}
