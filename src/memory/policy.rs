//! Which conversational turns become memories.
//!
//! A turn is stored when the prompt starts with "remember ", or contains "i feel"
//! or "i'm feeling". Only "i feel" makes it a **feeling**; every other stored
//! turn, "i'm feeling" included, is kept as a **fact**. Matching is
//! case-insensitive.

use crate::memory::types::MemoryType;

/// Phrase that marks a turn as a decaying feeling.
pub const FEELING_PHRASE: &str = "i feel";

/// Phrases that trigger a write without implying a feeling.
pub const FACT_TRIGGERS: &[&str] = &["i'm feeling"];

/// Prefix of an explicit remember request.
pub const REMEMBER_PREFIX: &str = "remember ";

/// Decide how (or whether) a prompt is persisted.
pub fn classify_turn(prompt: &str) -> Option<MemoryType> {
    let lowered = prompt.trim_start().to_lowercase();

    if lowered.contains(FEELING_PHRASE) {
        Some(MemoryType::Feeling)
    } else if lowered.starts_with(REMEMBER_PREFIX) || FACT_TRIGGERS.iter().any(|p| lowered.contains(p)) {
        Some(MemoryType::Fact)
    } else {
        None
    }
}
