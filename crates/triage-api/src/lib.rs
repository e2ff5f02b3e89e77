//! HTTP surface for the triage service.
//!
//! Exposes the dialogue router, free-form consultations, saved consultation
//! history and prescription reports as a bearer-token protected JSON API.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
