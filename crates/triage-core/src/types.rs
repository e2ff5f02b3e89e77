use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TriageError};

// =============================================================================
// Enums
// =============================================================================

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The person describing symptoms.
    Patient,
    /// The specialist persona (generated or fallback reply).
    Assistant,
}

/// How the router behaves when a message matches a different specialist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralPolicy {
    /// Stop and ask the caller to switch specialist; no persona reply.
    #[default]
    PreemptOnReferral,
    /// Let the current persona answer once and attach a soft suggestion.
    AnswerThenSuggest,
}

// =============================================================================
// Specialists
// =============================================================================

/// A specialist persona with its keyword scope and report medicines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistProfile {
    /// Unique identifier, e.g. "eye".
    pub key: String,
    /// Display name of the persona, e.g. "Eye Doctor".
    pub title: String,
    /// Keywords matched as lower-case substrings of patient input.
    pub scope: Vec<String>,
    /// Medicine and dosage lines attached to the prescription report.
    pub medicines: Vec<String>,
}

impl SpecialistProfile {
    pub fn new(key: &str, title: &str, scope: &[&str], medicines: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            scope: scope.iter().map(|s| s.to_string()).collect(),
            medicines: medicines.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// True if any scope keyword occurs in the already lower-cased text.
    pub fn matches_lowercase(&self, lower: &str) -> bool {
        self.scope
            .iter()
            .any(|keyword| lower.contains(keyword.to_lowercase().as_str()))
    }

    /// The opening line this persona speaks when a consultation starts.
    pub fn opening_line(&self) -> String {
        format!(
            "Hello! I'm your {}. What symptoms are you experiencing?",
            self.title
        )
    }
}

/// Immutable, ordered set of specialist profiles.
///
/// Order is part of the matching contract: the first profile whose scope
/// matches a message wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecialistCatalog {
    profiles: Vec<SpecialistProfile>,
    default_key: String,
}

impl SpecialistCatalog {
    /// Build a catalog, validating keys and scopes.
    pub fn new(profiles: Vec<SpecialistProfile>, default_key: &str) -> Result<Self> {
        if profiles.is_empty() {
            return Err(TriageError::Config(
                "at least one specialist must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for profile in &profiles {
            if profile.key.trim().is_empty() {
                return Err(TriageError::Config(
                    "specialist key must not be empty".to_string(),
                ));
            }
            if !seen.insert(profile.key.as_str()) {
                return Err(TriageError::Config(format!(
                    "duplicate specialist key: {}",
                    profile.key
                )));
            }
            if profile.scope.is_empty() {
                return Err(TriageError::Config(format!(
                    "specialist '{}' has an empty scope",
                    profile.key
                )));
            }
            // A blank keyword is a substring of every message.
            if profile.scope.iter().any(|k| k.trim().is_empty()) {
                return Err(TriageError::Config(format!(
                    "specialist '{}' has a blank scope keyword",
                    profile.key
                )));
            }
        }

        if !seen.contains(default_key) {
            return Err(TriageError::Config(format!(
                "default specialist '{}' is not configured",
                default_key
            )));
        }

        Ok(Self {
            profiles,
            default_key: default_key.to_string(),
        })
    }

    /// Profiles in configuration order.
    pub fn profiles(&self) -> &[SpecialistProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SpecialistProfile> {
        self.profiles.iter().find(|p| p.key == key)
    }

    /// The fallback profile used for unknown keys.
    pub fn default_profile(&self) -> &SpecialistProfile {
        // Presence of the default key is checked in `new`.
        self.get(&self.default_key).unwrap_or(&self.profiles[0])
    }

    /// Look up a profile, silently substituting the default for unknown keys.
    pub fn resolve(&self, key: &str) -> &SpecialistProfile {
        self.get(key).unwrap_or_else(|| self.default_profile())
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// A suggestion to move the patient to a different specialist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub recommended_key: String,
    pub recommended_title: String,
}

impl Referral {
    pub fn to(profile: &SpecialistProfile) -> Self {
        Self {
            recommended_key: profile.key.clone(),
            recommended_title: profile.title.clone(),
        }
    }
}

/// One message exchanged within a consultation. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    /// Specialist key suggested by this turn. Only set on assistant turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
}

impl ConversationTurn {
    pub fn patient(content: impl Into<String>) -> Self {
        Self {
            role: Role::Patient,
            content: content.into(),
            referral: None,
        }
    }

    pub fn assistant(content: impl Into<String>, referral: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            referral,
        }
    }

    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }
}

// =============================================================================
// Persistence
// =============================================================================

/// A saved consultation: one transcript and the assistant's answer to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRecord {
    pub id: Uuid,
    /// Patient identifier supplied by the auth layer.
    pub patient_id: String,
    pub transcript: String,
    pub ai_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConsultationRecord {
    pub fn new(
        patient_id: &str,
        transcript: &str,
        ai_response: &str,
        specialty: Option<&str>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            transcript: transcript.to_string(),
            ai_response: ai_response.to_string(),
            specialty: specialty.map(str::to_string),
            created_at: Utc::now(),
        }
    }
}
