//! Route handler functions for all API endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use triage_chat::{ChatError, Decision, PrescriptionReport};
use triage_core::{ConsultationRecord, ConversationTurn, SpecialistProfile};

use crate::auth::PatientId;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 200;

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub total_consultations: u64,
    /// Which text generator backs persona replies ("gemini" or "disabled").
    pub generator: String,
}

/// GET /health - liveness and basic counters.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let total_consultations = state.consultations.count()?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        total_consultations,
        generator: state.router.generator_name().to_string(),
    }))
}

// =============================================================================
// Chat
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Current specialist key; unknown or missing keys use the default.
    #[serde(default)]
    pub specialty: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(flatten)]
    pub decision: Decision,
}

/// POST /api/chat - route one patient message.
///
/// A body that is not a valid chat request is routed as an empty message,
/// so the patient hears the repeat line instead of a framework error.
/// Oversized bodies are still rejected.
pub async fn chat(
    State(state): State<AppState>,
    patient: PatientId,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, Response> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection @ JsonRejection::BytesRejection(_)) => {
            return Err(rejection.into_response());
        }
        Err(rejection) => {
            warn!(patient = %patient.0, error = %rejection.body_text(), "Malformed chat request");
            ChatRequest::default()
        }
    };

    let specialty = body
        .specialty
        .as_deref()
        .unwrap_or(&state.config.dialogue.default_specialty);

    let decision = state.router.decide(&body.message, specialty).await;
    info!(
        patient = %patient.0,
        specialty = %specialty,
        kind = ?decision.kind,
        "Chat message routed"
    );

    Ok(Json(ChatResponse {
        success: true,
        decision,
    }))
}

// =============================================================================
// Specialists
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialistsResponse {
    pub default_key: String,
    /// Profiles in matching order.
    pub specialists: Vec<SpecialistProfile>,
}

/// GET /api/specialists - the ordered catalog.
pub async fn specialists(State(state): State<AppState>) -> Json<SpecialistsResponse> {
    let catalog = state.router.catalog();
    Json(SpecialistsResponse {
        default_key: catalog.default_profile().key.clone(),
        specialists: catalog.profiles().to_vec(),
    })
}

// =============================================================================
// Free-form consultation
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ConsultationRequest {
    #[serde(default)]
    pub transcript: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationResponse {
    pub success: bool,
    pub ai_response: String,
}

/// POST /api/consultation - single-shot guidance for a spoken transcript.
pub async fn consultation(
    State(state): State<AppState>,
    patient: PatientId,
    Json(body): Json<ConsultationRequest>,
) -> Result<Json<ConsultationResponse>, ApiError> {
    let transcript = body.transcript.trim();
    if transcript.is_empty() {
        return Err(ApiError::BadRequest("No transcript provided".to_string()));
    }

    let ai_response = state.router.consult(transcript).await.map_err(|e| {
        warn!(patient = %patient.0, error = %e, "Consultation generation failed");
        ApiError::ServiceUnavailable("Failed to process consultation".to_string())
    })?;

    state
        .consultations
        .record_consultation(&patient.0, transcript, &ai_response, None)?;

    Ok(Json(ConsultationResponse {
        success: true,
        ai_response,
    }))
}

// =============================================================================
// Consultation history
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultationsResponse {
    pub consultations: Vec<ConsultationRecord>,
    pub count: usize,
}

/// GET /api/consultations - the caller's saved consultations, newest first.
pub async fn consultations(
    State(state): State<AppState>,
    patient: PatientId,
    Query(params): Query<ListParams>,
) -> Result<Json<ConsultationsResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let consultations = state.consultations.list_for_patient(&patient.0, limit)?;

    Ok(Json(ConsultationsResponse {
        count: consultations.len(),
        consultations,
    }))
}

/// GET /api/consultations/{id} - one of the caller's saved consultations.
///
/// Records owned by another patient are reported as not found.
pub async fn consultation_by_id(
    State(state): State<AppState>,
    patient: PatientId,
    Path(id): Path<String>,
) -> Result<Json<ConsultationRecord>, ApiError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid consultation id: {}", id)))?;

    match state.consultations.find_by_id(id)? {
        Some(record) if record.patient_id == patient.0 => Ok(Json(record)),
        _ => Err(ApiError::NotFound(format!("Consultation {} not found", id))),
    }
}

// =============================================================================
// Prescription report
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub specialty: Option<String>,
    pub turns: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: String,
    pub filename: String,
}

/// POST /api/report - render the prescription for a finished conversation
/// and save it to the caller's history.
pub async fn report(
    State(state): State<AppState>,
    patient: PatientId,
    Json(body): Json<ReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    check_reportable(&body.turns)?;

    let key = body
        .specialty
        .as_deref()
        .unwrap_or(&state.config.dialogue.default_specialty);
    let profile = state.router.catalog().resolve(key);

    let report = PrescriptionReport::render(profile, &body.turns, &state.config.report, Local::now());

    let transcript = body
        .turns
        .iter()
        .filter(|t| t.is_patient())
        .map(|t| t.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    state.consultations.record_consultation(
        &patient.0,
        &transcript,
        &report.text,
        Some(&profile.key),
    )?;

    info!(patient = %patient.0, specialty = %profile.key, "Prescription report generated");

    Ok(Json(ReportResponse {
        report: report.text,
        filename: report.filename,
    }))
}

/// A report needs a patient turn, and the latest reply must not be asking
/// the patient to switch specialist.
fn check_reportable(turns: &[ConversationTurn]) -> Result<(), ChatError> {
    if !turns.iter().any(ConversationTurn::is_patient) {
        return Err(ChatError::NoPatientTurns);
    }
    let pending = turns
        .iter()
        .rev()
        .find(|t| !t.is_patient())
        .and_then(|t| t.referral.clone());
    match pending {
        Some(key) => Err(ChatError::ReferralPending(key)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reportable() {
        let greeting = ConversationTurn::assistant("Hello!", None);
        assert!(matches!(
            check_reportable(&[greeting.clone()]),
            Err(ChatError::NoPatientTurns)
        ));

        let patient = ConversationTurn::patient("I have a fever");
        let redirect = ConversationTurn::assistant("See the General Doctor", Some("general".into()));
        assert!(matches!(
            check_reportable(&[greeting.clone(), patient.clone(), redirect]),
            Err(ChatError::ReferralPending(_))
        ));

        let reply = ConversationTurn::assistant("How long?", None);
        assert!(check_reportable(&[greeting, patient, reply]).is_ok());
    }
}
