//! Temporal scoping: turn a calendar day into a transcript inclusion filter.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

use crate::store::TranscriptStore;
use crate::vector::InclusionFilter;

/// The half-open UTC interval `[start of day, start of next day)`.
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = day
        .checked_add_days(Days::new(1))
        .map(|next| next.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}

/// Filter to transcripts overlapping `day`.
///
/// Returns `None` ("search everything") when no transcript overlaps the day or
/// when the store lookup fails. Scoping is best effort and never fails a query.
pub fn build_day_filter(store: &dyn TranscriptStore, day: NaiveDate) -> Option<InclusionFilter> {
    let (start, end) = day_window(day);
    match store.transcript_ids_overlapping(start, end) {
        Ok(ids) => {
            let filter = InclusionFilter::for_transcripts(ids);
            match &filter {
                Some(f) => tracing::debug!(%day, transcripts = f.len(), "day filter built"),
                None => tracing::debug!(%day, "no transcripts for day, searching unfiltered"),
            }
            filter
        }
        Err(e) => {
            tracing::error!(%day, error = %e, "day filter lookup failed, searching unfiltered");
            None
        }
    }
}
