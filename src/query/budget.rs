//! Token budgeting for the assembled prompt.
//!
//! [`plan_context`] is the pure greedy selection over precomputed costs;
//! [`BudgetPlanner`] prices the actual rendered text with a [`TokenCounter`]
//! and feeds it in.

use std::sync::Arc;

use serde::Serialize;

use super::message::ConversationMessage;
use super::prompt;
use crate::tokens::TokenCounter;
use crate::vector::RetrievedCandidate;

/// Window size, answer reservation and optional explicit target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub context_window: usize,
    pub answer_reserve: usize,
    /// Ignored when `None` or zero.
    pub target_override: Option<usize>,
}

impl ContextBudget {
    /// `window - reserve` (floored at zero), lowered to the override when one is set.
    pub fn effective_target(&self) -> usize {
        let ceiling = self.context_window.saturating_sub(self.answer_reserve);
        match self.target_override {
            Some(target) if target > 0 => target.min(ceiling),
            _ => ceiling,
        }
    }
}

/// Outcome of one planning pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextPlan {
    /// Index of the oldest selected history message. Selected history is
    /// `history[history_start..]`; equal to `history.len()` when none fit.
    pub history_start: usize,
    /// Selected excerpts are `candidates[..excerpt_count]`.
    pub excerpt_count: usize,
    pub fixed_tokens: usize,
    pub history_tokens: usize,
    pub excerpt_tokens: usize,
    pub target: usize,
}

impl ContextPlan {
    pub fn total_tokens(&self) -> usize {
        self.fixed_tokens + self.history_tokens + self.excerpt_tokens
    }
}

/// Greedy, order-preserving selection.
///
/// History is walked newest to oldest and excerpts in the given order; each
/// walk stops at the first item that does not fit, so the result is always a
/// newest-first suffix of the history and a prefix of the candidates.
pub fn plan_context(
    target: usize,
    fixed_tokens: usize,
    history_costs: &[usize],
    excerpt_costs: &[usize],
) -> ContextPlan {
    let mut available = target.saturating_sub(fixed_tokens);

    let mut history_start = history_costs.len();
    let mut history_tokens = 0;
    for (idx, &cost) in history_costs.iter().enumerate().rev() {
        if cost > available {
            break;
        }
        available -= cost;
        history_tokens += cost;
        history_start = idx;
    }

    let mut excerpt_count = 0;
    let mut excerpt_tokens = 0;
    for &cost in excerpt_costs {
        if cost > available {
            break;
        }
        available -= cost;
        excerpt_tokens += cost;
        excerpt_count += 1;
    }

    ContextPlan {
        history_start,
        excerpt_count,
        fixed_tokens,
        history_tokens,
        excerpt_tokens,
        target,
    }
}

/// Prices prompt pieces with one [`TokenCounter`] and runs [`plan_context`].
pub struct BudgetPlanner {
    counter: Arc<dyn TokenCounter>,
    budget: ContextBudget,
}

impl BudgetPlanner {
    pub fn new(counter: Arc<dyn TokenCounter>, budget: ContextBudget) -> Self {
        Self { counter, budget }
    }

    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    pub fn fixed_cost(&self, question: &str, has_history: bool) -> usize {
        prompt::fixed_segments(question, has_history)
            .iter()
            .map(|s| self.counter.count(s))
            .sum()
    }

    /// Cost of the candidate at `position` (0-based) as it would render in the prompt.
    pub fn excerpt_cost(&self, position: usize, candidate: &RetrievedCandidate) -> usize {
        let mut rendered = prompt::render_excerpt(position + 1, candidate);
        rendered.push_str(prompt::EXCERPT_SEPARATOR);
        self.counter.count(&rendered)
    }

    pub fn history_cost(&self, message: &ConversationMessage) -> usize {
        self.counter.count(&prompt::render_history_line(message))
    }

    pub fn plan(
        &self,
        question: &str,
        history: &[ConversationMessage],
        candidates: &[RetrievedCandidate],
    ) -> ContextPlan {
        let target = self.budget.effective_target();
        let fixed = self.fixed_cost(question, !history.is_empty());

        if target <= fixed {
            tracing::warn!(
                target,
                fixed_tokens = fixed,
                context_window = self.budget.context_window,
                answer_reserve = self.budget.answer_reserve,
                target_override = ?self.budget.target_override,
                "budget misconfiguration: no room for history or excerpts"
            );
        }

        let history_costs: Vec<usize> = history.iter().map(|m| self.history_cost(m)).collect();
        let excerpt_costs: Vec<usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| self.excerpt_cost(i, c))
            .collect();

        let plan = plan_context(target, fixed, &history_costs, &excerpt_costs);
        tracing::debug!(
            target,
            fixed_tokens = plan.fixed_tokens,
            history_selected = history.len() - plan.history_start,
            history_tokens = plan.history_tokens,
            excerpts_selected = plan.excerpt_count,
            excerpts_offered = candidates.len(),
            excerpt_tokens = plan.excerpt_tokens,
            "context plan computed"
        );
        plan
    }
}
