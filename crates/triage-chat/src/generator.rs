//! Generative-text capability used for persona replies.
//!
//! The router only sees [`TextGenerator`]; [`GeminiClient`] is the one
//! concrete vendor client and [`DisabledGenerator`] stands in when no API key
//! is configured.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use triage_core::config::GenerativeConfig;

use crate::error::GenerationError;

// =============================================================================
// Request
// =============================================================================

/// Everything the generative service needs for one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Who the model speaks as, e.g. "Eye Doctor".
    pub persona_title: String,
    /// Topics the persona may discuss. Empty for the general assistant.
    pub allowed_topics: Vec<String>,
    /// Standing rules placed between the persona line and the patient text.
    pub instructions: String,
    pub patient_message: String,
    /// Final line asking for the reply.
    pub response_cue: String,
}

impl GenerationRequest {
    /// Render the request as one prompt string.
    pub fn render(&self) -> String {
        let persona = if self.allowed_topics.is_empty() {
            format!("You are {}.", self.persona_title)
        } else {
            format!(
                "You are a {} in a voice medical consultation. Your specialty: {}.",
                self.persona_title,
                self.allowed_topics.join(", ")
            )
        };

        format!(
            "{}\n\n{}\n\nPatient says: \"{}\"\n\n{}",
            persona,
            self.instructions.trim_end(),
            self.patient_message.trim(),
            self.response_cue
        )
    }
}

// =============================================================================
// Capability trait
// =============================================================================

/// A service that turns a prompt into reply text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}

/// Generator used when the service is switched off or has no key.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable)
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

// =============================================================================
// Gemini client
// =============================================================================

/// Client for the `generateContent` endpoint of the Gemini API.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidatePart {
    text: String,
}

impl GeminiClient {
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout_secs: u64) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout_secs,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let prompt = request.render();
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: &prompt }],
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling generative service");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        first_candidate_text(parsed)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Join the text parts of the first candidate; blank text is an error.
fn first_candidate_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Build the configured generator, disabling it when no API key is set.
pub fn build_generator(config: &GenerativeConfig) -> Arc<dyn TextGenerator> {
    if !config.enabled {
        info!("Generative replies disabled by configuration");
        return Arc::new(DisabledGenerator);
    }

    match config.api_key() {
        Some(key) => {
            info!(model = %config.model, "Generative replies enabled");
            Arc::new(GeminiClient::new(
                &config.endpoint,
                &config.model,
                &key,
                config.timeout_secs,
            ))
        }
        None => {
            info!(
                env = %config.api_key_env,
                "No API key found, using fallback replies only"
            );
            Arc::new(DisabledGenerator)
        }
    }
}
