//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use lifelog_recall::config::RecallConfig;
use lifelog_recall::db;
use lifelog_recall::store::sqlite::{corpus_summary, latest_transcript_start};

/// Run database diagnostics and print a health report.
pub fn doctor(config: &RecallConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Transcripts are written by the ingestion pipeline; nothing to check yet.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;
    let summary = corpus_summary(&conn).context("failed to count transcripts")?;
    let latest = latest_transcript_start(&conn).context("failed to read latest transcript")?;

    println!("lifelog-recall Health Report");
    println!("============================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!();
    println!("Embedding model:");
    println!(
        "  Stored:          {}",
        report.embedding_model.as_deref().unwrap_or("(not set)")
    );
    println!("  Configured:      {}", config.embedding.model);
    if let Some(ref stored) = report.embedding_model {
        if stored != &config.embedding.model {
            println!("  WARNING: model mismatch! Stored vectors must be re-embedded by the ingestion side.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    println!();
    println!("Row counts:");
    println!(
        "  Transcripts:     {} ({} chunked)",
        summary.transcripts, summary.chunked_transcripts
    );
    println!("  Excerpts:        {}", summary.excerpts);
    println!("  Embedded:        {}", summary.embedded_excerpts);
    if summary.embedded_excerpts < summary.excerpts {
        println!(
            "  Note:            {} excerpts have no vector and cannot be retrieved",
            summary.excerpts - summary.embedded_excerpts
        );
    }
    match latest {
        Some(start) => println!("  Latest session:  {}", start.format("%Y-%m-%d %H:%M UTC")),
        None => println!("  Latest session:  (none)"),
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery: restore the database from a backup, e.g.");
        println!("  cp backup.db {}", db_path.display());
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
