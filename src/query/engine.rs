//! The public question-answering entry point.
//!
//! [`QueryEngine`] drives one question through the pipeline in strict
//! sequence: dates special case, temporal filter, retrieval, recency
//! injection, budget planning, prompt assembly, generation. It never returns
//! an error; every external failure maps to a defined [`AnswerOutcome`].

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use super::budget::{BudgetPlanner, ContextBudget};
use super::filter::build_day_filter;
use super::message::ConversationMessage;
use super::prompt;
use super::recency::{RecencyInjector, has_recency_cue};
use super::retriever::SimilarityRetriever;
use crate::embedding::EmbeddingProvider;
use crate::generation::Generator;
use crate::store::TranscriptStore;
use crate::tokens::TokenCounter;
use crate::vector::{RetrievedCandidate, VectorStore};

pub const NO_RELEVANT_INFORMATION: &str =
    "I couldn't find any relevant information in the transcripts to answer your question.";
pub const GENERATION_FAILED: &str = "I encountered an error while trying to generate an answer.";
pub const DATES_FAILED: &str =
    "I encountered an error while trying to look up which dates have transcript data.";
pub const NO_DATES: &str = "I don't have any transcript data yet.";
const DATES_HEADER: &str = "I have transcript data for the following dates:";

/// Normalised phrasings answered from the date listing instead of retrieval.
const DATES_PHRASINGS: &[&str] = &[
    "what days do you have data for",
    "what dates do you have data for",
    "which days do you have data for",
    "which dates do you have data for",
    "what dates are available",
    "what days are available",
    "list available dates",
    "list dates",
];

/// Source of "today" (UTC).
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always reports the same day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Which transcripts similarity search may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryScope {
    AllDays,
    #[default]
    Today,
    Day(NaiveDate),
}

impl QueryScope {
    fn resolve(self, clock: &dyn Clock) -> Option<NaiveDate> {
        match self {
            Self::AllDays => None,
            Self::Today => Some(clock.today()),
            Self::Day(day) => Some(day),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub query: String,
    pub k: usize,
    /// Prior turns, oldest first.
    pub history: Vec<ConversationMessage>,
    /// `None` uses the engine's default scope.
    pub scope: Option<QueryScope>,
}

impl AnswerRequest {
    pub fn new(query: impl Into<String>, k: usize) -> Self {
        Self {
            query: query.into(),
            k,
            history: Vec::new(),
            scope: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_scope(mut self, scope: QueryScope) -> Self {
        self.scope = Some(scope);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// The generator produced the answer text.
    Generated,
    /// Answered from the date listing; nothing was retrieved.
    DatesListed,
    /// The date listing could not be read.
    DatesUnavailable,
    /// Retrieval came back empty; the generator was not called.
    NoRelevantExcerpts,
    /// The generator failed; `excerpts_used` is what the prompt carried.
    GenerationFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Excerpts placed in the prompt, in prompt order.
    pub excerpts_used: Vec<RetrievedCandidate>,
    pub outcome: AnswerOutcome,
}

impl Answer {
    fn without_excerpts(text: impl Into<String>, outcome: AnswerOutcome) -> Self {
        Self {
            text: text.into(),
            excerpts_used: Vec::new(),
            outcome,
        }
    }
}

/// Orchestrates retrieval, recency injection, budgeting and generation.
///
/// Holds no per-call state, so one engine may serve concurrent callers. Every
/// method blocks; async callers should use `tokio::task::spawn_blocking`.
pub struct QueryEngine {
    store: Arc<dyn TranscriptStore>,
    retriever: SimilarityRetriever,
    injector: RecencyInjector,
    planner: BudgetPlanner,
    generator: Arc<dyn Generator>,
    clock: Arc<dyn Clock>,
    default_scope: QueryScope,
}

impl QueryEngine {
    pub fn new(
        store: Arc<dyn TranscriptStore>,
        vectors: Arc<dyn VectorStore>,
        embedding: Arc<dyn EmbeddingProvider>,
        counter: Arc<dyn TokenCounter>,
        generator: Arc<dyn Generator>,
        budget: ContextBudget,
    ) -> Self {
        Self {
            retriever: SimilarityRetriever::new(embedding, vectors),
            injector: RecencyInjector::new(Arc::clone(&store)),
            planner: BudgetPlanner::new(counter, budget),
            store,
            generator,
            clock: Arc::new(SystemClock),
            default_scope: QueryScope::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_default_scope(mut self, scope: QueryScope) -> Self {
        self.default_scope = scope;
        self
    }

    pub fn budget(&self) -> ContextBudget {
        self.planner.budget()
    }

    /// Answer `query` from up to `k` excerpts using the default scope and no history.
    pub fn answer(&self, query: &str, k: usize) -> Answer {
        self.answer_with(AnswerRequest::new(query, k))
    }

    pub fn answer_with(&self, request: AnswerRequest) -> Answer {
        let AnswerRequest {
            query,
            k,
            history,
            scope,
        } = request;
        tracing::info!(query_len = query.len(), k, history = history.len(), "answering question");

        if is_dates_query(&query) {
            return self.list_dates();
        }

        let today = self.clock.today();
        let scope = scope.unwrap_or(self.default_scope);
        let filter = scope
            .resolve(self.clock.as_ref())
            .and_then(|day| build_day_filter(self.store.as_ref(), day));

        let mut candidates = self.retriever.retrieve(&query, k, filter.as_ref());
        if candidates.is_empty() {
            tracing::warn!(?scope, "no excerpts retrieved, skipping generation");
            return Answer::without_excerpts(NO_RELEVANT_INFORMATION, AnswerOutcome::NoRelevantExcerpts);
        }

        if has_recency_cue(&query) {
            self.injector.inject(&mut candidates, today);
        }

        let plan = self.planner.plan(&query, &history, &candidates);
        candidates.truncate(plan.excerpt_count);
        let selected_history = &history[plan.history_start..];

        let prompt = prompt::assemble(selected_history, &candidates, &query);
        tracing::debug!(
            prompt_len = prompt.len(),
            planned_tokens = plan.total_tokens(),
            "prompt assembled"
        );

        match self.generator.generate(&prompt) {
            Ok(text) => {
                tracing::info!(excerpts_used = candidates.len(), "answer generated");
                Answer {
                    text,
                    excerpts_used: candidates,
                    outcome: AnswerOutcome::Generated,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "generation failed");
                Answer {
                    text: GENERATION_FAILED.to_string(),
                    excerpts_used: candidates,
                    outcome: AnswerOutcome::GenerationFailed,
                }
            }
        }
    }

    fn list_dates(&self) -> Answer {
        list_dates(self.store.as_ref())
    }
}

/// Answer "which dates do you have" straight from the store.
///
/// A store failure becomes the fixed [`DATES_FAILED`] apology.
pub fn list_dates(store: &dyn TranscriptStore) -> Answer {
    match store.distinct_transcript_dates() {
        Ok(mut dates) => {
            dates.sort_unstable();
            dates.dedup();
            tracing::info!(dates = dates.len(), "answered from date listing");
            Answer::without_excerpts(format_dates_list(&dates), AnswerOutcome::DatesListed)
        }
        Err(e) => {
            tracing::error!(error = %e, "date listing failed");
            Answer::without_excerpts(DATES_FAILED, AnswerOutcome::DatesUnavailable)
        }
    }
}

/// Lower-case, collapse whitespace, drop trailing `?`, `.` and `!`.
fn normalize_query(query: &str) -> String {
    let collapsed = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(['?', '.', '!'])
        .trim_end()
        .to_string()
}

/// True when `query` is one of the fixed "which dates do you have" phrasings.
pub fn is_dates_query(query: &str) -> bool {
    let normalized = normalize_query(query);
    DATES_PHRASINGS.contains(&normalized.as_str())
}

pub fn format_dates_list(dates: &[NaiveDate]) -> String {
    if dates.is_empty() {
        return NO_DATES.to_string();
    }
    let mut out = String::from(DATES_HEADER);
    for date in dates {
        out.push_str("\n- ");
        out.push_str(&date.format("%Y-%m-%d").to_string());
    }
    out
}
