//! Client-side consultation state.
//!
//! A session belongs to one specialist selection. Turns are append-only and
//! are discarded when the patient switches specialist or resets.

use serde::Serialize;
use triage_core::{ConversationTurn, SpecialistProfile};

use crate::error::ChatError;
use crate::router::{Decision, DecisionKind};

/// Where the consultation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DialogueState {
    /// Opening line shown, no persona reply yet.
    Greeting,
    /// Collecting symptoms; counts persona replies so far.
    Gathering { question_count: u32 },
    /// The patient signalled closure; only the report remains.
    Closing,
    /// Report produced.
    Reported,
}

/// The topic the persona is expected to ask about next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStage {
    Duration,
    Severity,
    Triggers,
    RelatedSymptoms,
    PriorTreatment,
    Closing,
}

impl TopicStage {
    fn after_questions(count: u32) -> Self {
        match count {
            0 => TopicStage::Duration,
            1 => TopicStage::Severity,
            2 => TopicStage::Triggers,
            3 => TopicStage::RelatedSymptoms,
            4 => TopicStage::PriorTreatment,
            _ => TopicStage::Closing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsultationSession {
    specialist_key: String,
    specialist_title: String,
    opening_line: String,
    state: DialogueState,
    turns: Vec<ConversationTurn>,
    pending_referral: Option<String>,
}

impl ConsultationSession {
    /// Begin a consultation; the opening line is the first assistant turn.
    pub fn start(profile: &SpecialistProfile) -> Self {
        let opening_line = profile.opening_line();
        Self {
            specialist_key: profile.key.clone(),
            specialist_title: profile.title.clone(),
            turns: vec![ConversationTurn::assistant(opening_line.clone(), None)],
            opening_line,
            state: DialogueState::Greeting,
            pending_referral: None,
        }
    }

    pub fn specialist_key(&self) -> &str {
        &self.specialist_key
    }

    pub fn specialist_title(&self) -> &str {
        &self.specialist_title
    }

    pub fn opening_line(&self) -> &str {
        &self.opening_line
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Specialist key suggested by the latest reply, if any.
    pub fn pending_referral(&self) -> Option<&str> {
        self.pending_referral.as_deref()
    }

    pub fn question_count(&self) -> u32 {
        match self.state {
            DialogueState::Gathering { question_count } => question_count,
            _ => 0,
        }
    }

    /// True once the patient has signalled closure or the report exists.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, DialogueState::Closing | DialogueState::Reported)
    }

    /// Append the patient message and the router's reply.
    ///
    /// A "please repeat" reply records nothing.
    pub fn record_exchange(&mut self, patient: &str, decision: &Decision) -> Result<(), ChatError> {
        if self.state == DialogueState::Reported {
            return Err(ChatError::AlreadyReported);
        }
        if decision.kind == DecisionKind::Repeat {
            return Ok(());
        }

        let suggested = decision.suggested_specialist().map(str::to_string);
        self.turns.push(ConversationTurn::patient(patient.trim()));
        self.turns
            .push(ConversationTurn::assistant(decision.message.clone(), suggested.clone()));
        self.pending_referral = suggested;

        let asked = matches!(decision.kind, DecisionKind::Generated | DecisionKind::Fallback);
        self.state = match self.state {
            _ if decision.is_closing() => DialogueState::Closing,
            DialogueState::Closing => DialogueState::Closing,
            DialogueState::Greeting if asked => DialogueState::Gathering { question_count: 1 },
            DialogueState::Gathering { question_count } if asked => DialogueState::Gathering {
                question_count: question_count + 1,
            },
            state => state,
        };
        Ok(())
    }

    /// Topic the next persona question should cover.
    pub fn expected_topic(&self) -> TopicStage {
        match self.state {
            DialogueState::Greeting => TopicStage::Duration,
            DialogueState::Gathering { question_count } => TopicStage::after_questions(question_count),
            DialogueState::Closing | DialogueState::Reported => TopicStage::Closing,
        }
    }

    pub fn has_patient_turns(&self) -> bool {
        self.turns.iter().any(ConversationTurn::is_patient)
    }

    /// The report may be requested once the patient has spoken and no
    /// specialist switch is pending.
    pub fn can_request_report(&self) -> bool {
        self.has_patient_turns() && self.pending_referral.is_none()
    }

    pub fn mark_reported(&mut self) -> Result<(), ChatError> {
        if !self.has_patient_turns() {
            return Err(ChatError::NoPatientTurns);
        }
        if let Some(key) = &self.pending_referral {
            return Err(ChatError::ReferralPending(key.clone()));
        }
        self.state = DialogueState::Reported;
        Ok(())
    }

    /// Discard the conversation and start over with another specialist.
    pub fn switch_specialist(&mut self, profile: &SpecialistProfile) {
        *self = Self::start(profile);
    }

    /// Discard the conversation and start over with the same specialist.
    pub fn reset(&mut self) {
        let opening_line = self.opening_line.clone();
        self.turns = vec![ConversationTurn::assistant(opening_line, None)];
        self.state = DialogueState::Greeting;
        self.pending_referral = None;
    }

    /// Plain-text transcript, one "Speaker: text" line per turn.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| {
                let speaker = if turn.is_patient() {
                    "Patient"
                } else {
                    self.specialist_title.as_str()
                };
                format!("{}: {}", speaker, turn.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::Referral;

    use crate::fallback::{CLOSING_LINE, REPEAT_LINE};

    fn eye() -> SpecialistProfile {
        SpecialistProfile::new("eye", "Eye Doctor", &["eye"], &["Artificial Tears"])
    }

    fn general() -> SpecialistProfile {
        SpecialistProfile::new("general", "General Doctor", &["fever"], &["Paracetamol"])
    }

    fn decision(message: &str, kind: DecisionKind) -> Decision {
        Decision {
            message: message.to_string(),
            redirect_to: None,
            referral: None,
            kind,
        }
    }

    fn asked(message: &str) -> Decision {
        decision(message, DecisionKind::Fallback)
    }

    #[test]
    fn test_start_shows_opening_line() {
        let session = ConsultationSession::start(&eye());
        assert_eq!(session.state(), DialogueState::Greeting);
        assert_eq!(session.turns().len(), 1);
        assert_eq!(
            session.turns()[0].content,
            "Hello! I'm your Eye Doctor. What symptoms are you experiencing?"
        );
        assert!(!session.can_request_report());
        assert_eq!(session.expected_topic(), TopicStage::Duration);
    }

    #[test]
    fn test_gathering_counts_questions_and_topics() {
        let mut session = ConsultationSession::start(&eye());
        let expected = [
            TopicStage::Severity,
            TopicStage::Triggers,
            TopicStage::RelatedSymptoms,
            TopicStage::PriorTreatment,
            TopicStage::Closing,
            TopicStage::Closing,
        ];
        for (i, topic) in expected.iter().enumerate() {
            session.record_exchange("my eye hurts", &asked("How long?")).unwrap();
            assert_eq!(session.question_count(), i as u32 + 1);
            assert_eq!(session.expected_topic(), *topic);
        }
        assert_eq!(session.turns().len(), 1 + 2 * expected.len());
    }

    #[test]
    fn test_greeting_reply_does_not_count() {
        let mut session = ConsultationSession::start(&eye());
        let opening = session.opening_line().to_string();
        session
            .record_exchange("hello", &decision(&opening, DecisionKind::Greeting))
            .unwrap();
        assert_eq!(session.state(), DialogueState::Greeting);
        assert_eq!(session.turns().len(), 3);
    }

    #[test]
    fn test_repeat_records_nothing() {
        let mut session = ConsultationSession::start(&eye());
        session
            .record_exchange("   ", &decision(REPEAT_LINE, DecisionKind::Repeat))
            .unwrap();
        assert_eq!(session.turns().len(), 1);
        assert!(!session.has_patient_turns());
    }

    #[test]
    fn test_closing_is_sticky() {
        let mut session = ConsultationSession::start(&eye());
        session.record_exchange("my eye hurts", &asked("How long?")).unwrap();
        session
            .record_exchange("nothing else", &decision(CLOSING_LINE, DecisionKind::Closing))
            .unwrap();
        assert_eq!(session.state(), DialogueState::Closing);
        assert!(session.is_closed());

        session.record_exchange("oh and it itches", &asked("Any redness?")).unwrap();
        assert_eq!(session.state(), DialogueState::Closing);
        assert_eq!(session.expected_topic(), TopicStage::Closing);
    }

    #[test]
    fn test_pending_referral_blocks_report() {
        let mut session = ConsultationSession::start(&eye());
        let redirect = Decision {
            message: "Please switch to the General Doctor.".to_string(),
            redirect_to: Some("general".to_string()),
            referral: None,
            kind: DecisionKind::Redirect,
        };
        session.record_exchange("I have a fever", &redirect).unwrap();
        assert_eq!(session.pending_referral(), Some("general"));
        assert_eq!(session.turns().last().unwrap().referral.as_deref(), Some("general"));
        assert!(!session.can_request_report());
        assert!(matches!(
            session.mark_reported(),
            Err(ChatError::ReferralPending(key)) if key == "general"
        ));

        session.record_exchange("my eye is red", &asked("Since when?")).unwrap();
        assert!(session.pending_referral().is_none());
        assert!(session.can_request_report());
    }

    #[test]
    fn test_soft_referral_is_recorded() {
        let mut session = ConsultationSession::start(&eye());
        let suggest = Decision {
            message: "Rest your eyes. Our General Doctor can help too.".to_string(),
            redirect_to: None,
            referral: Some(Referral::to(&general())),
            kind: DecisionKind::Generated,
        };
        session.record_exchange("I have a fever", &suggest).unwrap();
        assert_eq!(session.pending_referral(), Some("general"));
        assert_eq!(session.question_count(), 1);
    }

    #[test]
    fn test_mark_reported_requires_patient_turn() {
        let mut session = ConsultationSession::start(&eye());
        assert!(matches!(session.mark_reported(), Err(ChatError::NoPatientTurns)));

        session.record_exchange("my eye hurts", &asked("How long?")).unwrap();
        session.mark_reported().unwrap();
        assert_eq!(session.state(), DialogueState::Reported);
        assert!(matches!(
            session.record_exchange("one more thing", &asked("Yes?")),
            Err(ChatError::AlreadyReported)
        ));
    }

    #[test]
    fn test_switch_and_reset_return_to_greeting() {
        let mut session = ConsultationSession::start(&eye());
        session.record_exchange("my eye hurts", &asked("How long?")).unwrap();
        session.mark_reported().unwrap();

        session.reset();
        assert_eq!(session.state(), DialogueState::Greeting);
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.specialist_key(), "eye");

        session.record_exchange("I have a fever", &asked("How long?")).unwrap();
        session.switch_specialist(&general());
        assert_eq!(session.state(), DialogueState::Greeting);
        assert_eq!(session.specialist_title(), "General Doctor");
        assert_eq!(session.turns().len(), 1);
        assert!(session.pending_referral().is_none());
    }

    #[test]
    fn test_transcript_lines() {
        let mut session = ConsultationSession::start(&eye());
        session.record_exchange("  my eye hurts ", &asked("How long?")).unwrap();
        let transcript = session.transcript();
        let lines: Vec<&str> = transcript.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Eye Doctor: Hello!"));
        assert_eq!(lines[1], "Patient: my eye hurts");
        assert_eq!(lines[2], "Eye Doctor: How long?");
    }

    #[test]
    fn test_state_serializes_tagged() {
        let json = serde_json::to_value(DialogueState::Gathering { question_count: 2 }).unwrap();
        assert_eq!(json["state"], "gathering");
        assert_eq!(json["question_count"], 2);
    }
}
