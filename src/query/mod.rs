//! Retrieval and context assembly.
//!
//! The pipeline runs strictly in sequence for each question:
//!
//! 1. [`engine`] checks for the "list available dates" query class.
//! 2. [`filter`] resolves an optional day into an inclusion filter.
//! 3. [`retriever`] embeds the question and runs similarity search.
//! 4. [`recency`] injects today's latest transcript when the question says "today".
//! 5. [`budget`] decides how much history and how many excerpts fit.
//! 6. [`prompt`] renders the final prompt.
//! 7. [`engine`] calls the generator and packages the [`engine::Answer`].

pub mod budget;
pub mod engine;
pub mod filter;
pub mod message;
pub mod prompt;
pub mod recency;
pub mod retriever;
