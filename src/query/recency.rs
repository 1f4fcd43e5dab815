//! Recency override for "what just happened" questions.
//!
//! The only cue is the whole word "today", case-insensitive. Phrasings like
//! "this morning" or "just now" are not detected, and a "today" inside an
//! unrelated sentence still triggers injection.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;

use super::filter::day_window;
use crate::store::TranscriptStore;
use crate::store::types::Transcript;
use crate::vector::RetrievedCandidate;

const RECENCY_CUE: &str = "today";

/// True when `query` contains "today" as a whole word.
pub fn has_recency_cue(query: &str) -> bool {
    query
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word.eq_ignore_ascii_case(RECENCY_CUE))
}

/// Stable sort by owning transcript start, newest first. Candidates without a
/// start time sort last and keep their relative order.
pub fn sort_newest_first(candidates: &mut [RetrievedCandidate]) {
    candidates.sort_by_key(|c| Reverse(c.transcript_start));
}

pub struct RecencyInjector {
    store: Arc<dyn TranscriptStore>,
}

impl RecencyInjector {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Self {
        Self { store }
    }

    /// Union every excerpt of `today`'s latest transcript into `candidates`
    /// and re-sort the whole list newest first.
    ///
    /// Returns how many excerpts were added. When no transcript overlaps
    /// `today`, or the lookup fails, `candidates` is left untouched.
    pub fn inject(&self, candidates: &mut Vec<RetrievedCandidate>, today: NaiveDate) -> usize {
        let latest = match self.latest_transcript(today) {
            Ok(Some(t)) => t,
            Ok(None) => {
                tracing::debug!(%today, "no transcript today, recency injection skipped");
                return 0;
            }
            Err(e) => {
                tracing::error!(%today, error = %e, "latest transcript lookup failed, recency injection skipped");
                return 0;
            }
        };

        let excerpts = match self.store.excerpts_of_transcript(latest.id) {
            Ok(excerpts) => excerpts,
            Err(e) => {
                tracing::error!(
                    transcript_id = latest.id,
                    error = %e,
                    "excerpt lookup failed, recency injection skipped"
                );
                return 0;
            }
        };

        let mut seen: HashSet<i64> = candidates.iter().map(|c| c.id).collect();
        let mut added = 0;
        for excerpt in &excerpts {
            if seen.insert(excerpt.id) {
                candidates.push(RetrievedCandidate::from_excerpt(excerpt, latest.start_time));
                added += 1;
            }
        }

        sort_newest_first(candidates);
        tracing::info!(
            transcript_id = latest.id,
            added,
            candidates = candidates.len(),
            "recency injection applied"
        );
        added
    }

    /// Latest-starting transcript overlapping `day`, ties to the highest id.
    fn latest_transcript(&self, day: NaiveDate) -> Result<Option<Transcript>> {
        let (start, end) = day_window(day);
        let mut latest: Option<Transcript> = None;
        for id in self.store.transcript_ids_overlapping(start, end)? {
            let Some(transcript) = self.store.transcript_by_id(id)? else {
                continue;
            };
            let newer = match &latest {
                None => true,
                Some(cur) => (transcript.start_time, transcript.id) > (cur.start_time, cur.id),
            };
            if newer {
                latest = Some(transcript);
            }
        }
        Ok(latest)
    }
}
