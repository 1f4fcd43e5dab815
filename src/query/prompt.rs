//! Prompt assembly.
//!
//! Everything here is a pure function of its arguments. Excerpts are shown to
//! the model by ordinal and transcript id only; timestamps never appear in the
//! prompt.

use super::message::ConversationMessage;
use crate::vector::RetrievedCandidate;

pub const INSTRUCTIONS: &str = "You are a helpful assistant answering questions based on the following transcript context.\n\
Answer the user's question accurately using ONLY the provided context.\n\
If the answer is not found in the context, state that clearly.\n\n";

pub const HISTORY_HEADER: &str = "Conversation history:\n";
pub const HISTORY_FOOTER: &str = "\n";
pub const CONTEXT_HEADER: &str = "Context:\n-------\n";
pub const EXCERPT_SEPARATOR: &str = "\n---\n";
pub const NO_EXCERPTS: &str = "No excerpts fit within the context budget.";
pub const CONTEXT_FOOTER: &str = "\n-------\n\n";
pub const ANSWER_CUE: &str = "Answer:";

/// `N. (Transcript: <id>): <content>`, with `ordinal` starting at 1.
pub fn render_excerpt(ordinal: usize, candidate: &RetrievedCandidate) -> String {
    format!(
        "{ordinal}. (Transcript: {}): {}",
        candidate.transcript_id, candidate.content
    )
}

pub fn render_history_line(message: &ConversationMessage) -> String {
    format!("{}: {}\n", message.role.label(), message.content)
}

pub fn render_question(question: &str) -> String {
    format!("Question: {question}\n")
}

/// Prompt text that does not depend on which history or excerpts are selected.
///
/// Includes the "no excerpts" marker and, when `has_history`, the history
/// block framing, so the sum over-counts by at most those pieces.
pub fn fixed_segments(question: &str, has_history: bool) -> Vec<String> {
    let mut segments = vec![
        INSTRUCTIONS.to_string(),
        CONTEXT_HEADER.to_string(),
        NO_EXCERPTS.to_string(),
        CONTEXT_FOOTER.to_string(),
        render_question(question),
        ANSWER_CUE.to_string(),
    ];
    if has_history {
        segments.push(HISTORY_HEADER.to_string());
        segments.push(HISTORY_FOOTER.to_string());
    }
    segments
}

/// Render the final prompt from already-selected history (oldest first) and excerpts.
pub fn assemble(
    history: &[ConversationMessage],
    excerpts: &[RetrievedCandidate],
    question: &str,
) -> String {
    let mut prompt = String::from(INSTRUCTIONS);

    if !history.is_empty() {
        prompt.push_str(HISTORY_HEADER);
        for message in history {
            prompt.push_str(&render_history_line(message));
        }
        prompt.push_str(HISTORY_FOOTER);
    }

    prompt.push_str(CONTEXT_HEADER);
    if excerpts.is_empty() {
        prompt.push_str(NO_EXCERPTS);
    } else {
        let rendered: Vec<String> = excerpts
            .iter()
            .enumerate()
            .map(|(i, c)| render_excerpt(i + 1, c))
            .collect();
        prompt.push_str(&rendered.join(EXCERPT_SEPARATOR));
    }
    prompt.push_str(CONTEXT_FOOTER);

    prompt.push_str(&render_question(question));
    prompt.push_str(ANSWER_CUE);
    prompt
}
