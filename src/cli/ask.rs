//! CLI `ask` command: run one question through the engine.

use anyhow::{Context, Result};

use lifelog_recall::config::RecallConfig;
use lifelog_recall::query::engine::{Answer, AnswerOutcome, AnswerRequest, QueryScope};
use lifelog_recall::setup::setup_engine;

pub async fn ask(
    config: RecallConfig,
    question: String,
    k: usize,
    all_days: bool,
    json: bool,
) -> Result<()> {
    // The engine and its HTTP client block, so both live off the runtime.
    let answer = tokio::task::spawn_blocking(move || -> Result<Answer> {
        let engine = setup_engine(&config)?;
        let mut request = AnswerRequest::new(question, k);
        if all_days {
            request = request.with_scope(QueryScope::AllDays);
        }
        Ok(engine.answer_with(request))
    })
    .await
    .context("query task panicked")??;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.text);

    if !answer.excerpts_used.is_empty() {
        println!();
        match answer.outcome {
            AnswerOutcome::GenerationFailed => println!("Excerpts that would have been used:"),
            _ => println!("Excerpts used:"),
        }
        for (i, excerpt) in answer.excerpts_used.iter().enumerate() {
            let when = excerpt
                .transcript_start
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown time".to_string());
            println!(
                "  {:>2}. transcript {} / excerpt {} ({when})",
                i + 1,
                excerpt.transcript_id,
                excerpt.id
            );
        }
    }

    Ok(())
}
