//! One conversation turn, end to end.
//!
//! A turn runs: rate-limit check → decay sweep → emotion score → ranked
//! context → model call → write policy. Storage trouble never ends a turn; the
//! store facade logs it and hands back a sentinel. Model errors are returned to
//! the shell, which reports them and keeps the session going.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;

use crate::config::AstraConfig;
use crate::emotion::{calculate_emotion, mood_label};
use crate::llm::ChatModel;
use crate::memory::forget::ForgetOutcome;
use crate::memory::search::RankedMemory;
use crate::memory::types::MemoryType;
use crate::memory::{MemoryError, MemoryStore, WriteOutcome};
use crate::rate_limit::{RateDecision, RateLimiter};

/// Subject under which a user's own name is remembered.
pub const USER_NAME_SUBJECT: &str = "user_name";

const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];
const FORGET_PREFIX: &str = "forget";

/// What a line of user input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    /// `forget <keyword>`. The keyword may be empty.
    Forget(String),
    Empty,
    Chat(String),
}

/// Classify a raw input line.
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    if EXIT_WORDS.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
        return Command::Exit;
    }

    let head = trimmed.get(..FORGET_PREFIX.len());
    if head.is_some_and(|h| h.eq_ignore_ascii_case(FORGET_PREFIX)) {
        let rest = &trimmed[FORGET_PREFIX.len()..];
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Command::Forget(rest.trim().to_string());
        }
    }

    Command::Chat(trimmed.to_string())
}

/// First letter upper-cased, the rest lower-cased.
pub fn normalize_user_name(raw: &str) -> String {
    let mut chars = raw.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Result of [`Session::respond`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    Reply {
        text: String,
        emotional_score: f64,
        stored: WriteOutcome,
    },
    /// The user is over their request budget; the model was not called.
    RateLimited { retry_after_secs: u64 },
}

/// Build the system prompt for one model call.
pub fn build_system_prompt(assistant_name: &str, memories: &[RankedMemory], emotional_score: f64) -> String {
    let mut prompt = format!(
        "You are {assistant_name}, a deeply emotional yet logically grounded AI assistant.\n\n[Recent Memories]\n"
    );
    for m in memories {
        let _ = writeln!(prompt, "- {}: {}", m.subject, m.value);
    }
    let _ = write!(
        prompt,
        "\n[User Emotional Score]\nCurrent: {emotional_score:.2} ({})\n\n\
         Respond thoughtfully, warmly, and insightfully based on the user's context.",
        mood_label(emotional_score)
    );
    prompt
}

/// A conversation with one store, one model, and an optional rate limiter.
pub struct Session {
    store: MemoryStore,
    model: Box<dyn ChatModel>,
    limiter: Option<RateLimiter>,
    assistant_name: String,
    context_limit: usize,
}

impl Session {
    pub fn new(
        store: MemoryStore,
        model: Box<dyn ChatModel>,
        limiter: Option<RateLimiter>,
        config: &AstraConfig,
    ) -> Self {
        Self {
            store,
            model,
            limiter,
            assistant_name: config.chat.assistant_name.clone(),
            context_limit: config.memory.context_limit,
        }
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Name of a returning user, normalized for greeting.
    pub fn existing_user(&self) -> Option<String> {
        self.store.existing_user().map(|u| normalize_user_name(&u))
    }

    /// Remember a new user's name as a fact and return the normalized name.
    pub fn register_user(&self, raw_name: &str) -> Result<String, MemoryError> {
        let name = normalize_user_name(raw_name);
        self.store
            .insert(&name, USER_NAME_SUBJECT, &name, 0.0, MemoryType::Fact)?;
        tracing::info!(user = %name, "new user registered");
        Ok(name)
    }

    pub fn forget(&self, user: &str, keyword: &str) -> Result<ForgetOutcome, MemoryError> {
        self.store.delete_by_keyword(user, keyword)
    }

    /// Run one turn for `user`.
    pub async fn respond(&self, user: &str, prompt: &str) -> Result<TurnOutcome> {
        if let Some(limiter) = &self.limiter {
            if let RateDecision::Limited { retry_after_secs } = limiter.check(user) {
                return Ok(TurnOutcome::RateLimited { retry_after_secs });
            }
        }

        if let Some(decay) = self.store.apply_decay() {
            tracing::debug!(affected = decay.affected, elapsed_ms = decay.elapsed_ms, "decay applied");
        }

        let emotional_score = calculate_emotion(prompt);
        let memories = self.store.top_n(user, self.context_limit)?;
        let system_prompt = build_system_prompt(&self.assistant_name, &memories, emotional_score);

        tracing::debug!(
            user = %user,
            model = %self.model.name(),
            context = memories.len(),
            emotional_score,
            "calling model"
        );
        let text = self.model.complete(&system_prompt, prompt).await?;

        let stored = self
            .store
            .persist_turn(user, prompt, &text, emotional_score)?;

        Ok(TurnOutcome::Reply {
            text,
            emotional_score,
            stored,
        })
    }
}
