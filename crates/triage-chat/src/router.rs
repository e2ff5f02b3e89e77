//! Per-message routing decision.
//!
//! The router classifies a patient message against the current specialist
//! and produces exactly one displayable reply. It never returns an error:
//! empty input asks the patient to repeat, and any generative failure falls
//! back to the canned replies in [`crate::fallback`].

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};
use triage_core::config::DialogueConfig;
use triage_core::{Referral, ReferralPolicy, SpecialistCatalog, SpecialistProfile};

use crate::classifier::{
    closing_collisions, is_end_of_conversation, is_gratitude, is_greeting_only, match_specialist,
};
use crate::error::{ChatError, GenerationError};
use crate::fallback::{
    redirect_line, referral_suggestion, smart_response, FollowUpSelector, CLOSING_LINE,
    REPEAT_LINE,
};
use crate::generator::{GenerationRequest, TextGenerator};
use crate::prompt::{consultation_request, persona_request, referral_note};

// =============================================================================
// Decision
// =============================================================================

/// Which branch produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Repeat,
    Greeting,
    Closing,
    Redirect,
    Generated,
    Fallback,
}

/// The router's answer to one patient message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Reply to display or speak. Never empty.
    pub message: String,
    /// Specialist to switch to before continuing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    /// Soft suggestion attached to a persona reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<Referral>,
    #[serde(skip)]
    pub kind: DecisionKind,
}

impl Decision {
    fn reply(message: impl Into<String>, kind: DecisionKind) -> Self {
        Self {
            message: message.into(),
            redirect_to: None,
            referral: None,
            kind,
        }
    }

    /// Specialist key this decision asks the patient to move to, if any.
    pub fn suggested_specialist(&self) -> Option<&str> {
        self.redirect_to
            .as_deref()
            .or_else(|| self.referral.as_ref().map(|r| r.recommended_key.as_str()))
    }

    pub fn is_closing(&self) -> bool {
        self.kind == DecisionKind::Closing
    }
}

/// Classification outcome: either a fixed reply or a persona turn.
enum Route<'a> {
    Fixed(Decision),
    Reply {
        persona: &'a SpecialistProfile,
        suggest: Option<&'a SpecialistProfile>,
    },
}

// =============================================================================
// DialogueRouter
// =============================================================================

pub struct DialogueRouter {
    catalog: SpecialistCatalog,
    generator: Arc<dyn TextGenerator>,
    policy: ReferralPolicy,
    selector: FollowUpSelector,
    language: String,
    timeout: Duration,
}

impl DialogueRouter {
    /// Create a router. Fails if a closing cue collides with a scope keyword.
    pub fn new(
        catalog: SpecialistCatalog,
        generator: Arc<dyn TextGenerator>,
        dialogue: &DialogueConfig,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let collisions = closing_collisions(&catalog);
        if !collisions.is_empty() {
            let details: Vec<String> = collisions
                .iter()
                .map(|c| format!("{}:'{}' vs '{}'", c.specialist, c.keyword, c.cue))
                .collect();
            return Err(ChatError::Config(format!(
                "scope keywords collide with closing phrases: {}",
                details.join(", ")
            )));
        }

        Ok(Self {
            catalog,
            generator,
            policy: dialogue.referral_policy,
            selector: FollowUpSelector::new(dialogue.fallback_seed),
            language: dialogue.response_language.clone(),
            timeout,
        })
    }

    pub fn catalog(&self) -> &SpecialistCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> ReferralPolicy {
        self.policy
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// First specialist, in catalog order, whose scope matches the message.
    pub fn match_specialist(&self, message: &str) -> Option<&SpecialistProfile> {
        match_specialist(message, &self.catalog)
    }

    /// Decide the reply to `message` spoken to the `specialty_key` persona.
    pub async fn decide(&self, message: &str, specialty_key: &str) -> Decision {
        match self.route(message, specialty_key) {
            Route::Reply { persona, suggest } => {
                let note = suggest.map(|s| referral_note(persona, s, self.default_key()));
                let request = persona_request(persona, message, &self.language, note.as_deref());
                match self.generate(&request).await {
                    Ok(text) => Decision {
                        message: text,
                        redirect_to: None,
                        referral: suggest.map(Referral::to),
                        kind: DecisionKind::Generated,
                    },
                    Err(e) => {
                        if matches!(e, GenerationError::Unavailable) {
                            debug!(specialty = %persona.key, "Generative service disabled, using fallback");
                        } else {
                            warn!(specialty = %persona.key, error = %e, "Generation failed, using fallback");
                        }
                        self.fallback(persona, message, suggest)
                    }
                }
            }
            Route::Fixed(decision) => decision,
        }
    }

    /// Decide without calling the generative service.
    pub fn decide_offline(&self, message: &str, specialty_key: &str) -> Decision {
        match self.route(message, specialty_key) {
            Route::Reply { persona, suggest } => self.fallback(persona, message, suggest),
            Route::Fixed(decision) => decision,
        }
    }

    /// Single-shot guidance for a free-form transcript. Errors are returned
    /// to the caller, not replaced by a fallback.
    pub async fn consult(&self, transcript: &str) -> Result<String, GenerationError> {
        self.generate(&consultation_request(transcript)).await
    }

    fn default_key(&self) -> &str {
        &self.catalog.default_profile().key
    }

    fn route<'a>(&'a self, message: &str, specialty_key: &str) -> Route<'a> {
        if message.trim().is_empty() {
            debug!("Empty message, asking to repeat");
            return Route::Fixed(Decision::reply(REPEAT_LINE, DecisionKind::Repeat));
        }

        let persona = self.catalog.resolve(specialty_key);
        let greeting = is_greeting_only(message);
        let ending = is_end_of_conversation(message);
        let gratitude = is_gratitude(message);
        let matched = self.match_specialist(message);

        debug!(
            specialty = %persona.key,
            greeting,
            ending,
            gratitude,
            matched = matched.map(|p| p.key.as_str()).unwrap_or("-"),
            "Classified message"
        );

        if greeting {
            return Route::Fixed(Decision::reply(
                persona.opening_line(),
                DecisionKind::Greeting,
            ));
        }
        if ending {
            return Route::Fixed(Decision::reply(CLOSING_LINE, DecisionKind::Closing));
        }

        let other = matched.filter(|m| m.key != persona.key && !gratitude);
        match (other, self.policy) {
            (Some(target), ReferralPolicy::PreemptOnReferral) => {
                debug!(redirect_to = %target.key, "Redirecting to another specialist");
                Route::Fixed(Decision {
                    message: redirect_line(&target.title),
                    redirect_to: Some(target.key.clone()),
                    referral: None,
                    kind: DecisionKind::Redirect,
                })
            }
            (suggest, _) => Route::Reply { persona, suggest },
        }
    }

    fn fallback(
        &self,
        persona: &SpecialistProfile,
        message: &str,
        suggest: Option<&SpecialistProfile>,
    ) -> Decision {
        let mut reply = smart_response(message, persona, &self.selector);
        if let Some(target) = suggest {
            reply.push(' ');
            reply.push_str(&referral_suggestion(&target.title));
        }
        Decision {
            message: reply,
            redirect_to: None,
            referral: suggest.map(Referral::to),
            kind: DecisionKind::Fallback,
        }
    }

    /// One bounded attempt; blank text counts as a failure.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let text = tokio::time::timeout(self.timeout, self.generator.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout.as_secs()))??;

        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
