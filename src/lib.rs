//! Astra: an emotionally aware conversational assistant with long-term memory.
//!
//! Each user turn is scored for emotional valence against a small fixed
//! lexicon, the user's most relevant memories are pulled from SQLite, and both
//! go into the system prompt of a chat-completion call. Selected turns are
//! written back as memories:
//!
//! | Type | Written when | Decay |
//! |------|--------------|-------|
//! | **Fact** | prompt starts with "remember " or contains "i'm feeling" (or a new user's name) | none |
//! | **Feeling** | prompt contains "i feel" | `score *= exp(-rate * hours)` per pass |
//!
//! Relevance is `emotional_score * (1 - age_days / 30)`. Each user holds at
//! most `max_memories` records; the least recently accessed are evicted.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, migrations, and health checks
//! - [`emotion`] — Lexicon-based emotion scoring
//! - [`memory`] — Memory engine: store, forget, decay, ranking, and the store facade
//! - [`llm`] — Chat-model port and the OpenAI-compatible client
//! - [`rate_limit`] — Per-user sliding-window request limiting
//! - [`session`] — Command parsing and the per-turn pipeline

pub mod config;
pub mod db;
pub mod emotion;
pub mod llm;
pub mod memory;
pub mod rate_limit;
pub mod session;
