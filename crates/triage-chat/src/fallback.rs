//! Canned replies used when the generative service is unavailable.
//!
//! Keyword groups are checked in a fixed priority order; the last resort
//! is one of a few generic follow-up prompts, picked deterministically from
//! the message so the same input always yields the same reply.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use triage_core::SpecialistProfile;

use crate::classifier::{is_end_of_conversation, is_greeting_only, normalize};

/// Reply for empty or whitespace-only input.
pub const REPEAT_LINE: &str = "I didn't catch that. Please repeat.";

/// Reply once the patient signals the end of the consultation.
pub const CLOSING_LINE: &str = "Thank you for sharing all that information. I have a good understanding of your symptoms now. Please click 'Get Prescription' to receive your personalized medical report and recommendations.";

static AFFIRMATIONS: &[&str] = &["yes", "yeah", "yep", "ok"];

static GENERIC_FOLLOW_UPS: &[&str] = &[
    "I see. Can you describe how this affects your daily activities?",
    "That's helpful. Are there any other symptoms you've noticed?",
    "Thank you for sharing. Has this happened before, or is this the first time?",
    "I understand. On a scale of 1-10, how would you rate the severity?",
];

/// Keyword groups in priority order, each with its reply.
static KEYWORD_REPLIES: &[(&[&str], &str)] = &[
    (
        &["night", "dark"],
        "Night vision problems can have several causes. How long have you been experiencing this? Do you also have trouble in dim lighting?",
    ),
    (
        &["severe", "bad", "worse"],
        "I'm sorry to hear it's severe. Have you experienced any other symptoms like pain, headaches, or sensitivity to light?",
    ),
    (
        &["started", "ago", "days", "week"],
        "Thank you for that information. Has it been getting progressively worse, or has it stayed the same since it started?",
    ),
    (
        &["pain"],
        "I understand you're in pain. Can you rate it from 1 to 10? Does anything make it better or worse?",
    ),
    (
        &["can't see", "cannot see", "don't see"],
        "Vision problems are concerning. Is the blurriness constant or does it come and go? Any pain or redness?",
    ),
    (
        &["blur"],
        "Blurry vision can have many causes. Is it in one eye or both? Do you wear glasses or contacts?",
    ),
    (
        &["cry", "tear", "watery"],
        "Excessive tearing can have various causes like allergies or blocked tear ducts. Is there any itching, redness, or discharge?",
    ),
    (
        &["can't look", "cannot look", "look well"],
        "Can you describe what happens when you try to see? Is it blurry, double vision, or something else?",
    ),
    (
        &["disease", "problem", "issue", "trouble"],
        "I understand. Can you describe specifically what you're experiencing? For example, is it pain, blurriness, or something else?",
    ),
    (
        &["poor vision", "vision problem"],
        "Vision problems need careful evaluation. Is it constant or does it come and go? One eye or both?",
    ),
];

// =============================================================================
// FollowUpSelector
// =============================================================================

/// Picks a generic follow-up as a pure function of (seed, message).
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowUpSelector {
    seed: u64,
}

impl FollowUpSelector {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Index into a list of `len` options. `len` must be non-zero.
    pub fn pick(&self, message: &str, len: usize) -> usize {
        let mut rng = StdRng::seed_from_u64(self.seed ^ fnv1a(message));
        rng.random_range(0..len)
    }
}

/// 64-bit FNV-1a, stable across runs and platforms.
fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

// =============================================================================
// Fallback reply
// =============================================================================

/// Produce a canned reply for `message` spoken to `profile`. Never empty.
pub fn smart_response(
    message: &str,
    profile: &SpecialistProfile,
    selector: &FollowUpSelector,
) -> String {
    let lower = normalize(message);

    if is_greeting_only(message) {
        return profile.opening_line();
    }

    if is_end_of_conversation(message) {
        return CLOSING_LINE.to_string();
    }

    if AFFIRMATIONS.contains(&lower.as_str()) {
        return "Can you tell me more about that?".to_string();
    }

    if lower.contains("thank") {
        return "You're welcome. Take care, and come back if you need anything.".to_string();
    }

    for (keywords, reply) in KEYWORD_REPLIES {
        if keywords.iter().any(|k| lower.contains(k)) {
            return reply.to_string();
        }
    }

    let index = selector.pick(&lower, GENERIC_FOLLOW_UPS.len());
    GENERIC_FOLLOW_UPS[index].to_string()
}

/// Sentence appended to a persona reply that suggests another specialist.
pub fn referral_suggestion(title: &str) -> String {
    format!(
        "These symptoms may be better handled by our {}. I recommend consulting them for more specialized care.",
        title
    )
}

/// Reply that asks the patient to switch specialist instead of answering.
pub fn redirect_line(title: &str) -> String {
    format!(
        "Your symptoms sound like something our {} should look at. Please switch to the {} for specialized care.",
        title, title
    )
}
