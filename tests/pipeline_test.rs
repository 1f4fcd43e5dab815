//! End-to-end runs over the real SQLite transcript store and sqlite-vec index.

mod helpers;

use std::sync::Arc;

use helpers::{
    FakeEmbedding, FakeGenerator, WordCounter, add_excerpt, add_transcript, at, embed, shared_db,
    test_embedding, today,
};
use lifelog_recall::db::{self, SharedConnection};
use lifelog_recall::query::budget::ContextBudget;
use lifelog_recall::query::engine::{
    list_dates, AnswerOutcome, AnswerRequest, FixedClock, QueryEngine, QueryScope, DATES_FAILED,
};
use lifelog_recall::query::filter::build_day_filter;
use lifelog_recall::store::sqlite::SqliteTranscriptStore;
use lifelog_recall::vector::sqlite_vec::SqliteVecStore;

fn engine(conn: &SharedConnection, embedding: FakeEmbedding, generator: Arc<FakeGenerator>) -> QueryEngine {
    QueryEngine::new(
        Arc::new(SqliteTranscriptStore::new(Arc::clone(conn))),
        Arc::new(SqliteVecStore::new(Arc::clone(conn))),
        Arc::new(embedding),
        Arc::new(WordCounter),
        generator,
        ContextBudget {
            context_window: 8192,
            answer_reserve: 1000,
            target_override: None,
        },
    )
    .with_clock(Arc::new(FixedClock(today())))
}

#[test]
fn today_scope_only_sees_todays_excerpts() {
    let conn = shared_db();
    let yesterday = today().pred_opt().unwrap();
    let (old, new) = {
        let c = db::lock(&conn).unwrap();
        let t_old = add_transcript(&c, "old", at(yesterday, 15, 0), 20);
        let t_new = add_transcript(&c, "new", at(today(), 15, 0), 20);
        (
            add_excerpt(&c, t_old, "dentist moved to Friday"),
            add_excerpt(&c, t_new, "picked up the dry cleaning"),
        )
    };
    embed(&conn, &[(old.clone(), test_embedding(7)), (new.clone(), test_embedding(8))]);

    let generator = Arc::new(FakeGenerator::replying("Friday."));
    let embedding = FakeEmbedding::new().with_vector("when is the dentist", test_embedding(7));
    let engine = engine(&conn, embedding, generator.clone());

    let scoped = engine.answer("when is the dentist", 5);
    assert_eq!(scoped.outcome, AnswerOutcome::Generated);
    assert_eq!(scoped.excerpts_used.len(), 1);
    assert_eq!(scoped.excerpts_used[0].id, new.id);

    let everything = engine
        .answer_with(AnswerRequest::new("when is the dentist", 5).with_scope(QueryScope::AllDays));
    assert_eq!(everything.excerpts_used[0].id, old.id);
    assert_eq!(everything.text, "Friday.");
}

#[test]
fn recency_injects_unembedded_excerpts_of_latest_transcript() {
    let conn = shared_db();
    let (early, late_indexed, late_pending) = {
        let c = db::lock(&conn).unwrap();
        let t_early = add_transcript(&c, "early", at(today(), 7, 0), 30);
        let t_late = add_transcript(&c, "late", at(today(), 13, 0), 30);
        (
            add_excerpt(&c, t_early, "coffee with Sam"),
            add_excerpt(&c, t_late, "lunch with Priya"),
            add_excerpt(&c, t_late, "Priya recommended a book"),
        )
    };
    // The last excerpt has no vector yet, so similarity search cannot find it.
    embed(
        &conn,
        &[
            (early.clone(), test_embedding(1)),
            (late_indexed.clone(), test_embedding(2)),
        ],
    );

    let generator = Arc::new(FakeGenerator::replying("You had lunch with Priya."));
    let engine = engine(&conn, FakeEmbedding::new(), generator.clone());

    let answer = engine.answer("who did I see today", 5);

    let ids: Vec<i64> = answer.excerpts_used.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(*ids.last().unwrap(), early.id);
    assert!(ids[..2].contains(&late_indexed.id));
    assert!(ids[..2].contains(&late_pending.id));

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("Priya recommended a book"));
    assert!(!prompt.contains("13:00"));
}

#[test]
fn equal_start_times_inject_the_higher_transcript_id() {
    let conn = shared_db();
    let (first, first_pending, second) = {
        let c = db::lock(&conn).unwrap();
        let t_first = add_transcript(&c, "first", at(today(), 9, 0), 30);
        let t_second = add_transcript(&c, "second", at(today(), 9, 0), 30);
        assert!(t_second > t_first);
        (
            add_excerpt(&c, t_first, "booked the flights"),
            add_excerpt(&c, t_first, "seat upgrade was declined"),
            add_excerpt(&c, t_second, "hotel confirmation arrived"),
        )
    };
    // Only the lower id's first excerpt is searchable.
    embed(&conn, &[(first.clone(), test_embedding(5))]);

    let generator = Arc::new(FakeGenerator::replying("Flights and hotel are sorted."));
    let engine = engine(&conn, FakeEmbedding::new(), generator.clone());

    let answer = engine.answer("what got booked today?", 5);

    let ids: Vec<i64> = answer.excerpts_used.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert!(!ids.contains(&first_pending.id));

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("hotel confirmation arrived"));
    assert!(!prompt.contains("seat upgrade was declined"));
}

#[test]
fn day_filter_is_none_for_empty_day() {
    let conn = shared_db();
    {
        let c = db::lock(&conn).unwrap();
        add_transcript(&c, "t", at(today(), 10, 0), 10);
    }
    let store = SqliteTranscriptStore::new(conn);

    assert!(build_day_filter(&store, today()).is_some());
    assert!(build_day_filter(&store, today().succ_opt().unwrap()).is_none());
}

struct BrokenStore;

impl lifelog_recall::store::TranscriptStore for BrokenStore {
    fn transcript_ids_overlapping(
        &self,
        _start: chrono::DateTime<chrono::Utc>,
        _end: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<Vec<i64>> {
        anyhow::bail!("database is locked")
    }

    fn excerpts_of_transcript(
        &self,
        _transcript_id: i64,
    ) -> anyhow::Result<Vec<lifelog_recall::store::types::Excerpt>> {
        anyhow::bail!("database is locked")
    }

    fn transcript_by_id(
        &self,
        _id: i64,
    ) -> anyhow::Result<Option<lifelog_recall::store::types::Transcript>> {
        anyhow::bail!("database is locked")
    }

    fn distinct_transcript_dates(&self) -> anyhow::Result<Vec<chrono::NaiveDate>> {
        anyhow::bail!("database is locked")
    }
}

#[test]
fn store_failures_never_fail_the_question() {
    assert!(build_day_filter(&BrokenStore, today()).is_none());

    // The vector index still works even though relational lookups fail.
    let conn = shared_db();
    let excerpt = {
        let c = db::lock(&conn).unwrap();
        let t = add_transcript(&c, "t", at(today(), 10, 0), 10);
        add_excerpt(&c, t, "the car needs an oil change")
    };
    embed(&conn, &[(excerpt.clone(), test_embedding(4))]);

    let generator = Arc::new(FakeGenerator::replying("Get an oil change."));
    let engine = QueryEngine::new(
        Arc::new(BrokenStore),
        Arc::new(SqliteVecStore::new(Arc::clone(&conn))),
        Arc::new(FakeEmbedding::new()),
        Arc::new(WordCounter),
        generator.clone(),
        ContextBudget {
            context_window: 8192,
            answer_reserve: 1000,
            target_override: None,
        },
    )
    .with_clock(Arc::new(FixedClock(today())));

    let answer = engine.answer("what does the car need today", 5);
    assert_eq!(answer.outcome, AnswerOutcome::Generated);
    assert_eq!(answer.excerpts_used.len(), 1);
    assert_eq!(answer.excerpts_used[0].id, excerpt.id);

    let dates = engine.answer("list available dates", 5);
    assert_eq!(dates.outcome, AnswerOutcome::DatesUnavailable);
    assert_eq!(generator.call_count(), 1);
}

#[test]
fn date_listing_matches_engine_path() {
    let broken = list_dates(&BrokenStore);
    assert_eq!(broken.outcome, AnswerOutcome::DatesUnavailable);
    assert_eq!(broken.text, DATES_FAILED);

    let conn = shared_db();
    {
        let c = db::lock(&conn).unwrap();
        add_transcript(&c, "late", at(today(), 18, 0), 10);
        add_transcript(&c, "early", at(today().pred_opt().unwrap(), 8, 0), 10);
        add_transcript(&c, "same-day", at(today(), 7, 0), 10);
    }
    let store = SqliteTranscriptStore::new(Arc::clone(&conn));
    let direct = list_dates(&store);
    assert_eq!(direct.outcome, AnswerOutcome::DatesListed);
    assert!(direct.excerpts_used.is_empty());

    let via_engine = engine(&conn, FakeEmbedding::new(), Arc::new(FakeGenerator::replying("unused")))
        .answer("what dates are available?", 5);
    assert_eq!(via_engine.text, direct.text);
    assert_eq!(direct.text.lines().count(), 3);
}
