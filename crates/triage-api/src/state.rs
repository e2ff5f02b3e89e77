//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use triage_chat::{DialogueRouter, TextGenerator};
use triage_core::{TriageConfig, TriageError};
use triage_storage::{ConsultationRepository, Database};

use crate::auth::generate_token;

/// Shared application state. Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TriageConfig>,
    pub router: Arc<DialogueRouter>,
    pub consultations: Arc<ConsultationRepository>,
    /// Bearer token required on protected routes.
    pub api_token: String,
    pub start_time: Instant,
}

impl AppState {
    /// Build the state from configuration, a generator and an open database.
    ///
    /// The API token starts as a fresh random value; callers that persist a
    /// token overwrite `api_token`.
    pub fn new(
        config: TriageConfig,
        generator: Arc<dyn TextGenerator>,
        database: Database,
    ) -> Result<Self, TriageError> {
        let catalog = config.catalog()?;
        let router = DialogueRouter::new(
            catalog,
            generator,
            &config.dialogue,
            Duration::from_secs(config.generative.timeout_secs),
        )?;

        Ok(Self {
            config: Arc::new(config),
            router: Arc::new(router),
            consultations: Arc::new(ConsultationRepository::new(Arc::new(database))),
            api_token: generate_token(),
            start_time: Instant::now(),
        })
    }
}
