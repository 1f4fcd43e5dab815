mod helpers;

use lifelog_recall::db;
use lifelog_recall::db::migrations::{
    get_embedding_model, get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION,
    INITIAL_EMBEDDING_MODEL,
};
use lifelog_recall::embedding::EMBEDDING_DIM;
use lifelog_recall::store::sqlite::{excerpts_of_transcript, insert_excerpt, insert_transcript};
use lifelog_recall::store::types::{NewExcerpt, NewTranscript};
use lifelog_recall::vector::embedding_to_bytes;

#[test]
fn fresh_db_migrates_to_current_version() {
    let conn = helpers::test_db();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn migration_records_embedding_model() {
    let conn = helpers::test_db();
    let model = get_embedding_model(&conn).unwrap();
    assert_eq!(model.as_deref(), Some(INITIAL_EMBEDDING_MODEL));
}

#[test]
fn migrations_are_idempotent() {
    let conn = helpers::test_db();
    run_migrations(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn v1_db_reconciles_embedded_flags() {
    // A v1 database written before `is_embedded` was maintained.
    db::load_sqlite_vec();
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), 1);
    assert!(get_embedding_model(&conn).unwrap().is_none());

    let t = insert_transcript(
        &conn,
        &NewTranscript {
            source: "limitless".into(),
            source_id: "legacy".into(),
            ..Default::default()
        },
    )
    .unwrap();
    let with_vector = insert_excerpt(
        &conn,
        &NewExcerpt {
            transcript_id: t,
            content: "indexed".into(),
            ..Default::default()
        },
    )
    .unwrap();
    insert_excerpt(
        &conn,
        &NewExcerpt {
            transcript_id: t,
            content: "pending".into(),
            ..Default::default()
        },
    )
    .unwrap();
    let vector = vec![0.0f32; EMBEDDING_DIM];
    conn.execute(
        "INSERT INTO excerpts_vec (rowid, embedding) VALUES (?1, ?2)",
        rusqlite::params![with_vector, embedding_to_bytes(&vector)],
    )
    .unwrap();

    run_migrations(&conn).unwrap();

    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    assert!(get_embedding_model(&conn).unwrap().is_some());
    let flags: Vec<(i64, bool)> = excerpts_of_transcript(&conn, t)
        .unwrap()
        .into_iter()
        .map(|e| (e.id, e.is_embedded))
        .collect();
    assert_eq!(flags[0], (with_vector, true));
    assert!(!flags[1].1);
}
