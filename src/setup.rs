//! Wiring from configuration to a ready [`QueryEngine`].

use std::sync::Arc;

use anyhow::Result;

use crate::config::RecallConfig;
use crate::db::{self, SharedConnection};
use crate::embedding;
use crate::generation;
use crate::query::engine::{QueryEngine, QueryScope};
use crate::store::sqlite::SqliteTranscriptStore;
use crate::tokens;
use crate::vector::sqlite_vec::SqliteVecStore;

/// Open the database and warn when stored vectors came from another model.
pub fn open_shared_database(config: &RecallConfig) -> Result<SharedConnection> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    if let Ok(Some(stored_model)) = db::migrations::get_embedding_model(&conn) {
        if stored_model != config.embedding.model {
            tracing::warn!(
                stored = %stored_model,
                configured = %config.embedding.model,
                "embedding model changed, stored vectors will not match query vectors"
            );
        }
    }

    Ok(db::share(conn))
}

/// Build the engine with every collaborator taken from `config`.
///
/// Blocking: creates a `reqwest::blocking` client, so call it inside
/// `tokio::task::spawn_blocking` from async code.
pub fn setup_engine(config: &RecallConfig) -> Result<QueryEngine> {
    let conn = open_shared_database(config)?;
    let store = Arc::new(SqliteTranscriptStore::new(Arc::clone(&conn)));
    let vectors = Arc::new(SqliteVecStore::new(conn));

    let embedding: Arc<dyn embedding::EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    tracing::info!("embedding provider ready");

    let counter: Arc<dyn tokens::TokenCounter> =
        Arc::from(tokens::create_counter(&config.tokenizer)?);
    let generator: Arc<dyn generation::Generator> =
        Arc::from(generation::create_generator(&config.generation)?);

    let budget = config.context_budget();
    tracing::info!(
        context_window = budget.context_window,
        answer_reserve = budget.answer_reserve,
        effective_target = budget.effective_target(),
        "context budget configured"
    );

    let default_scope = if config.retrieval.scope_to_today {
        QueryScope::Today
    } else {
        QueryScope::AllDays
    };

    Ok(
        QueryEngine::new(store, vectors, embedding, counter, generator, budget)
            .with_default_scope(default_scope),
    )
}
