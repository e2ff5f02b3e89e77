//! SQLite persistence for saved consultations.
//!
//! Provides a WAL-mode database with versioned migrations and the
//! repository that records each transcript with the assistant's answer.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::ConsultationRepository;
