//! CLI `dates` command: the engine's date listing without loading any models.

use anyhow::Result;

use lifelog_recall::config::RecallConfig;
use lifelog_recall::query::engine::list_dates;
use lifelog_recall::setup::open_shared_database;
use lifelog_recall::store::sqlite::SqliteTranscriptStore;

/// Print every date that has transcript data.
pub fn dates(config: &RecallConfig) -> Result<()> {
    let store = SqliteTranscriptStore::new(open_shared_database(config)?);
    println!("{}", list_dates(&store).text);
    Ok(())
}
