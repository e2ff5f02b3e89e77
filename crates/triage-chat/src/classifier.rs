//! Message classification: greetings, closing signals, specialist scope.
//!
//! Greeting detection is a whole-message match; closing detection and
//! specialist matching look for phrases inside the message.

use std::sync::LazyLock;

use regex::Regex;
use triage_core::{SpecialistCatalog, SpecialistProfile};

// =============================================================================
// Phrase sets
// =============================================================================

/// Messages that are nothing but a greeting.
static PURE_GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
    "hi doctor",
    "hello doctor",
];

/// Short answers that end the consultation only when they are the whole message.
static CLOSING_TOKENS: &[&str] = &[
    "no",
    "nope",
    "not really",
    "nothing",
    "no other",
    "no concern",
];

/// Phrases that end the consultation wherever they appear in the message.
static CLOSING_PHRASES: &[&str] = &[
    "that's all",
    "thats all",
    "done",
    "finished",
    "end",
    "stop",
    "nothing else",
];

static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alts: Vec<String> = PURE_GREETINGS.iter().map(|g| regex::escape(g)).collect();
    Regex::new(&format!(r"^(?:{})[!.]?$", alts.join("|"))).expect("Invalid greeting regex")
});

static CLOSING_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alts: Vec<String> = CLOSING_PHRASES.iter().map(|p| regex::escape(p)).collect();
    Regex::new(&format!(r"\b(?:{})\b", alts.join("|"))).expect("Invalid closing regex")
});

// =============================================================================
// Classification
// =============================================================================

/// Lower-case and trim, folding typographic apostrophes from speech input.
pub fn normalize(message: &str) -> String {
    message.trim().to_lowercase().replace('\u{2019}', "'")
}

/// True only when the whole message is one of the pure greetings,
/// optionally followed by a single "!" or ".".
pub fn is_greeting_only(message: &str) -> bool {
    GREETING_RE.is_match(&normalize(message))
}

/// True when the patient signals there is nothing more to discuss.
pub fn is_end_of_conversation(message: &str) -> bool {
    let m = normalize(message);
    CLOSING_TOKENS.contains(&m.as_str()) || CLOSING_RE.is_match(&m)
}

/// True when the message thanks the doctor.
pub fn is_gratitude(message: &str) -> bool {
    normalize(message).contains("thank")
}

/// First specialist, in catalog order, whose scope occurs in the message.
pub fn match_specialist<'a>(
    message: &str,
    catalog: &'a SpecialistCatalog,
) -> Option<&'a SpecialistProfile> {
    let lower = message.to_lowercase();
    catalog
        .profiles()
        .iter()
        .find(|profile| profile.matches_lowercase(&lower))
}

// =============================================================================
// Collision check
// =============================================================================

/// A closing cue that would also fire on a specialist keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosingCollision {
    pub specialist: String,
    pub keyword: String,
    pub cue: String,
}

/// Find closing cues that overlap with any scope keyword in the catalog.
///
/// A keyword collides when a closing phrase occurs inside it as a word,
/// when it occurs as a word inside a closing phrase, or when it equals a
/// closing token.
pub fn closing_collisions(catalog: &SpecialistCatalog) -> Vec<ClosingCollision> {
    let mut collisions = Vec::new();

    for profile in catalog.profiles() {
        for keyword in &profile.scope {
            let keyword_lower = normalize(keyword);
            if keyword_lower.is_empty() {
                continue;
            }

            let mut cues: Vec<&str> = CLOSING_PHRASES
                .iter()
                .copied()
                .filter(|cue| contains_word(&keyword_lower, cue) || contains_word(cue, &keyword_lower))
                .collect();
            if CLOSING_TOKENS.contains(&keyword_lower.as_str()) {
                cues.push(keyword_lower.as_str());
            }

            for cue in cues {
                collisions.push(ClosingCollision {
                    specialist: profile.key.clone(),
                    keyword: keyword.clone(),
                    cue: cue.to_string(),
                });
            }
        }
    }

    collisions
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    Regex::new(&format!(r"\b{}\b", regex::escape(needle)))
        .map(|re| re.is_match(haystack))
        .unwrap_or(false)
}

// =============================================================================
// Tests
// =============================================================================
