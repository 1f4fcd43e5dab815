mod helpers;

use std::sync::Arc;

use helpers::{add_excerpt, add_transcript, at, blended_embedding, embed, shared_db, test_embedding, today};
use lifelog_recall::db;
use lifelog_recall::store::sqlite::excerpts_of_transcript;
use lifelog_recall::vector::sqlite_vec::SqliteVecStore;
use lifelog_recall::vector::{InclusionFilter, VectorStore};

#[test]
fn unfiltered_search_ranks_by_similarity() {
    let conn = shared_db();
    let (near, mid, far) = {
        let c = db::lock(&conn).unwrap();
        let t = add_transcript(&c, "t1", at(today(), 9, 0), 60);
        (
            add_excerpt(&c, t, "near"),
            add_excerpt(&c, t, "mid"),
            add_excerpt(&c, t, "far"),
        )
    };
    embed(
        &conn,
        &[
            (far.clone(), test_embedding(50)),
            (near.clone(), blended_embedding(1, 50, 0.1)),
            (mid.clone(), blended_embedding(1, 50, 0.9)),
        ],
    );

    let store = SqliteVecStore::new(Arc::clone(&conn));
    let results = store.search(&test_embedding(1), 3, None).unwrap();

    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![near.id, mid.id, far.id]);
    assert_eq!(results[0].content, "near");
    assert_eq!(results[0].transcript_start, Some(at(today(), 9, 0)));
}

#[test]
fn search_respects_k() {
    let conn = shared_db();
    let excerpts = {
        let c = db::lock(&conn).unwrap();
        let t = add_transcript(&c, "t1", at(today(), 9, 0), 60);
        (0..5u8)
            .map(|i| (add_excerpt(&c, t, &format!("excerpt {i}")), test_embedding(i)))
            .collect::<Vec<_>>()
    };
    embed(&conn, &excerpts);

    let store = SqliteVecStore::new(conn);
    assert_eq!(store.search(&test_embedding(0), 2, None).unwrap().len(), 2);
    assert!(store.search(&test_embedding(0), 0, None).unwrap().is_empty());
}

#[test]
fn filter_limits_results_to_listed_transcripts() {
    let conn = shared_db();
    let yesterday = today().pred_opt().unwrap();
    let (t_today, best_yesterday, only_today) = {
        let c = db::lock(&conn).unwrap();
        let t_old = add_transcript(&c, "old", at(yesterday, 9, 0), 60);
        let t_new = add_transcript(&c, "new", at(today(), 9, 0), 60);
        (
            t_new,
            add_excerpt(&c, t_old, "exact match from yesterday"),
            add_excerpt(&c, t_new, "weaker match from today"),
        )
    };
    embed(
        &conn,
        &[
            (best_yesterday.clone(), test_embedding(3)),
            (only_today.clone(), blended_embedding(3, 90, 1.5)),
        ],
    );

    let store = SqliteVecStore::new(conn);
    let filter = InclusionFilter::for_transcripts([t_today]).unwrap();

    let unfiltered = store.search(&test_embedding(3), 5, None).unwrap();
    assert_eq!(unfiltered[0].id, best_yesterday.id);

    let filtered = store.search(&test_embedding(3), 5, Some(&filter)).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, only_today.id);
    assert_eq!(filtered[0].transcript_id, t_today);
}

#[test]
fn add_marks_excerpts_embedded_and_replaces_vectors() {
    let conn = shared_db();
    let (t, excerpt) = {
        let c = db::lock(&conn).unwrap();
        let t = add_transcript(&c, "t1", at(today(), 9, 0), 60);
        (t, add_excerpt(&c, t, "re-embedded"))
    };

    embed(&conn, &[(excerpt.clone(), test_embedding(10))]);
    embed(&conn, &[(excerpt.clone(), test_embedding(20))]);

    let c = db::lock(&conn).unwrap();
    let stored = excerpts_of_transcript(&c, t).unwrap();
    assert!(stored[0].is_embedded);
    let vectors: i64 = c
        .query_row("SELECT COUNT(*) FROM excerpts_vec", [], |row| row.get(0))
        .unwrap();
    assert_eq!(vectors, 1);
    drop(c);

    let store = SqliteVecStore::new(conn);
    let results = store.search(&test_embedding(20), 1, None).unwrap();
    assert_eq!(results[0].id, excerpt.id);
}

#[test]
fn add_rejects_mismatched_lengths() {
    let conn = shared_db();
    let excerpt = {
        let c = db::lock(&conn).unwrap();
        let t = add_transcript(&c, "t1", at(today(), 9, 0), 60);
        add_excerpt(&c, t, "lonely")
    };
    let store = SqliteVecStore::new(conn);
    let err = store.add(&[excerpt], &[]).unwrap_err();
    assert!(err.to_string().contains("must be equal"));
}

#[test]
fn search_rejects_wrong_dimensions() {
    let store = SqliteVecStore::new(shared_db());
    assert!(store.search(&[0.5, 0.5], 3, None).is_err());
}
