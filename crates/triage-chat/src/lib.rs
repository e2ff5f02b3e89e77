//! Dialogue routing for specialist consultations.
//!
//! Classifies patient messages (greeting, closing, specialist scope),
//! decides between referral, canned reply, and generated reply, and keeps
//! the per-consultation state used to produce the prescription report.

pub mod classifier;
pub mod error;
pub mod fallback;
pub mod generator;
pub mod prompt;
pub mod report;
pub mod router;
pub mod session;

pub use classifier::{
    closing_collisions, is_end_of_conversation, is_gratitude, is_greeting_only, match_specialist,
};
pub use error::{ChatError, GenerationError};
pub use fallback::{FollowUpSelector, CLOSING_LINE, REPEAT_LINE};
pub use generator::{build_generator, DisabledGenerator, GeminiClient, GenerationRequest, TextGenerator};
pub use report::PrescriptionReport;
pub use router::{Decision, DecisionKind, DialogueRouter};
pub use session::{ConsultationSession, DialogueState, TopicStage};
