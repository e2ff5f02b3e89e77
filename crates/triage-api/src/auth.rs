//! API authentication via bearer tokens, plus the patient identity header.
//!
//! Protected routes require `Authorization: Bearer <token>`. Handlers that
//! act on behalf of a patient also require `x-patient-id`.

use std::path::Path;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rand::Rng;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated patient's identifier.
pub const PATIENT_HEADER: &str = "x-patient-id";

/// Generate a random 32-character hex token.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

/// Load token from file, or generate and save a new one.
pub fn load_or_generate_token(token_path: &Path) -> String {
    if let Ok(contents) = std::fs::read_to_string(token_path) {
        let token = contents.trim().to_string();
        if !token.is_empty() {
            tracing::info!("API token loaded from {}", token_path.display());
            return token;
        }
    }

    let token = generate_token();

    if let Some(parent) = token_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = std::fs::write(token_path, &token) {
        tracing::warn!(error = %e, "Failed to save API token to {}", token_path.display());
    } else {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(token_path, std::fs::Permissions::from_mode(0o600));
        }
        tracing::info!("API token saved to {}", token_path.display());
    }

    token
}

/// Middleware that validates Bearer token authentication.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(value) = req.headers().get("authorization") else {
        return ApiError::Unauthorized("Missing Authorization header".to_string()).into_response();
    };

    let Ok(value_str) = value.to_str() else {
        return ApiError::Unauthorized("Invalid Authorization header encoding".to_string())
            .into_response();
    };

    match value_str.strip_prefix("Bearer ") {
        Some(token) if token == state.api_token => next.run(req).await,
        _ => ApiError::Unauthorized("Invalid bearer token".to_string()).into_response(),
    }
}

/// The patient a request acts for, taken from the `x-patient-id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientId(pub String);

impl<S> FromRequestParts<S> for PatientId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(PATIENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| PatientId(id.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("Missing patient identity".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_is_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_load_or_generate_token_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("api_token");
        let first = load_or_generate_token(&path);
        assert!(path.exists());
        assert_eq!(load_or_generate_token(&path), first);
    }

    #[test]
    fn test_load_existing_token_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_token");
        std::fs::write(&path, "  abc123\n").unwrap();
        assert_eq!(load_or_generate_token(&path), "abc123");
    }

    #[tokio::test]
    async fn test_patient_id_extraction() {
        let (mut parts, _) = axum::http::Request::builder()
            .header(PATIENT_HEADER, "  pat@example.com ")
            .body(())
            .unwrap()
            .into_parts();
        let id = PatientId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(id, PatientId("pat@example.com".to_string()));

        let (mut parts, _) = axum::http::Request::builder()
            .header(PATIENT_HEADER, "   ")
            .body(())
            .unwrap()
            .into_parts();
        assert!(PatientId::from_request_parts(&mut parts, &()).await.is_err());
    }
}
