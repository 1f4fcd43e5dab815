//! Question answering over a personal lifelog transcript corpus.
//!
//! lifelog-recall retrieves time-stamped transcript excerpts that are relevant
//! to a question and assembles them, together with conversation history, into
//! a prompt that provably fits the generation model's context window.
//!
//! # Pipeline
//!
//! | Stage | Behavior |
//! |-------|----------|
//! | **Dates** | "What days do you have data for?" is answered from the store directly |
//! | **Scope** | Similarity search is limited to transcripts overlapping one UTC day (today by default) |
//! | **Retrieve** | The question is embedded and the nearest excerpts fetched |
//! | **Recency** | Questions containing "today" pull in every excerpt of today's latest transcript, newest first |
//! | **Budget** | Newest history, then excerpts in order, are taken greedily until the token target is reached |
//! | **Generate** | The assembled prompt goes to the model; failures become fixed fallback answers |
//!
//! # Architecture
//!
//! - **Storage**: SQLite, with [sqlite-vec](https://github.com/asg017/sqlite-vec) for vector search
//! - **Embeddings**: Local ONNX Runtime with bge-small-en-v1.5 (384 dimensions)
//! - **Generation**: Ollama over HTTP
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`store`]: Transcripts and excerpts in the relational store
//! - [`vector`]: Similarity search over excerpt embeddings
//! - [`embedding`]: Text-to-vector embedding pipeline via ONNX Runtime
//! - [`tokens`]: Token counting for prompt budgeting
//! - [`generation`]: Text generation clients
//! - [`query`]: Retrieval, recency injection, budgeting, and the [`query::engine::QueryEngine`]
//! - [`setup`]: Building an engine from configuration

pub mod config;
pub mod db;
pub mod embedding;
pub mod generation;
pub mod query;
pub mod setup;
pub mod store;
pub mod tokens;
pub mod vector;
