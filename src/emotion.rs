//! Keyword-pattern emotion scoring.
//!
//! Each category of the lexicon carries a signed weight. Every pattern that
//! matches the text adds its category's weight once, and the sum is clamped
//! to `[-1.0, 1.0]`. There is no length normalization, so a few strong words
//! saturate the score.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::LazyLock;

/// Score below which the user's mood is reported as a concern.
pub const CONCERN_THRESHOLD: f64 = -0.5;

/// A lexicon entry: category name, word-boundary patterns, signed weight.
pub struct EmotionCategory {
    pub name: &'static str,
    pub weight: f64,
    patterns: Vec<Regex>,
}

const LEXICON: &[(&str, &[&str], f64)] = &[
    ("fear", &["scared", "nervous", "anxious", "overwhelmed"], -0.8),
    ("anger", &["angry", "furious", "pissed"], -0.6),
    ("joy", &["happy", "excited", "great"], 0.7),
    ("sadness", &["sad", "depressed", "lonely", "feeling like shit"], -0.7),
];

static CATEGORIES: LazyLock<Vec<EmotionCategory>> = LazyLock::new(|| {
    LEXICON
        .iter()
        .map(|&(name, words, weight)| EmotionCategory {
            name,
            weight,
            patterns: words.iter().map(|w| word_pattern(w)).collect(),
        })
        .collect()
});

fn word_pattern(phrase: &str) -> Regex {
    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(phrase)))
        .case_insensitive(true)
        .build()
        .expect("lexicon patterns are valid regexes")
}

/// The compiled lexicon, built once on first use.
pub fn categories() -> &'static [EmotionCategory] {
    &CATEGORIES
}

/// Per-category contribution to a score.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryHit {
    pub category: &'static str,
    pub matches: usize,
    pub contribution: f64,
}

/// Full result of scoring a piece of text.
#[derive(Debug, Clone, Serialize)]
pub struct EmotionBreakdown {
    /// Sum of all contributions before clamping.
    pub raw: f64,
    /// Final score in `[-1.0, 1.0]`.
    pub score: f64,
    pub hits: Vec<CategoryHit>,
}

/// Score `text` and report which categories fired.
pub fn analyze(text: &str) -> EmotionBreakdown {
    let mut raw = 0.0;
    let mut hits = Vec::new();

    for category in categories() {
        let matches = category
            .patterns
            .iter()
            .filter(|p| p.is_match(text))
            .count();
        if matches == 0 {
            continue;
        }
        let contribution = category.weight * matches as f64;
        raw += contribution;
        hits.push(CategoryHit {
            category: category.name,
            matches,
            contribution,
        });
    }

    EmotionBreakdown {
        raw,
        score: raw.clamp(-1.0, 1.0),
        hits,
    }
}

/// Emotional valence of `text` in `[-1.0, 1.0]`. Unmatched text scores 0.0.
pub fn calculate_emotion(text: &str) -> f64 {
    analyze(text).score
}

/// Label used in the model's system prompt.
pub fn mood_label(score: f64) -> &'static str {
    if score < CONCERN_THRESHOLD {
        "Concern"
    } else {
        "Stable"
    }
}
