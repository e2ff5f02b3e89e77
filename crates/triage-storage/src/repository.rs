//! Repository for saved consultations.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tracing::debug;
use uuid::Uuid;

use triage_core::{ConsultationRecord, TriageError};

use crate::db::Database;

const SELECT_COLUMNS: &str =
    "SELECT id, patient_id, transcript, ai_response, specialty, created_at FROM consultations";

/// Stores transcript/response pairs per patient.
pub struct ConsultationRepository {
    db: Arc<Database>,
}

impl ConsultationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store one consultation and return the saved record.
    pub fn record_consultation(
        &self,
        patient_id: &str,
        transcript: &str,
        ai_response: &str,
        specialty: Option<&str>,
    ) -> Result<ConsultationRecord, TriageError> {
        let record = ConsultationRecord::new(patient_id, transcript, ai_response, specialty);
        self.save(&record)?;
        debug!(id = %record.id, specialty = ?record.specialty, "Consultation recorded");
        Ok(record)
    }

    pub fn save(&self, record: &ConsultationRecord) -> Result<(), TriageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO consultations (id, patient_id, transcript, ai_response, specialty, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    record.id.to_string(),
                    record.patient_id,
                    record.transcript,
                    record.ai_response,
                    record.specialty,
                    record.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| TriageError::Storage(format!("Failed to save consultation: {}", e)))?;
            Ok(())
        })
    }

    /// A patient's consultations, newest first.
    pub fn list_for_patient(
        &self,
        patient_id: &str,
        limit: u64,
    ) -> Result<Vec<ConsultationRecord>, TriageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "{SELECT_COLUMNS} WHERE patient_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
                ))
                .map_err(|e| TriageError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![patient_id, limit], |row| {
                    Ok(row_to_record(row))
                })
                .map_err(|e| TriageError::Storage(e.to_string()))?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row.map_err(|e| TriageError::Storage(e.to_string()))??);
            }
            Ok(records)
        })
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<ConsultationRecord>, TriageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
                .map_err(|e| TriageError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![id.to_string()], |row| Ok(row_to_record(row)))
                .optional()
                .map_err(|e| TriageError::Storage(e.to_string()))?;

            result.transpose()
        })
    }

    pub fn count(&self) -> Result<u64, TriageError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM consultations", [], |row| row.get(0))
                .map_err(|e| TriageError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<ConsultationRecord, TriageError> {
    let get_err = |e: rusqlite::Error| TriageError::Storage(e.to_string());

    let id_str: String = row.get(0).map_err(get_err)?;
    let created_ms: i64 = row.get(5).map_err(get_err)?;

    Ok(ConsultationRecord {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| TriageError::Storage(format!("Invalid UUID: {}", e)))?,
        patient_id: row.get(1).map_err(get_err)?,
        transcript: row.get(2).map_err(get_err)?,
        ai_response: row.get(3).map_err(get_err)?,
        specialty: row.get(4).map_err(get_err)?,
        created_at: Utc
            .timestamp_millis_opt(created_ms)
            .single()
            .unwrap_or_default(),
    })
}

/// Optional query results for rusqlite.
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_repo() -> ConsultationRepository {
        ConsultationRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn test_record_and_find() {
        let repo = make_repo();
        let saved = repo
            .record_consultation("pat@example.com", "I have a cough", "Rest and drink water.", Some("respiratory"))
            .unwrap();

        let found = repo.find_by_id(saved.id).unwrap().unwrap();
        assert_eq!(found.patient_id, "pat@example.com");
        assert_eq!(found.transcript, "I have a cough");
        assert_eq!(found.ai_response, "Rest and drink water.");
        assert_eq!(found.specialty.as_deref(), Some("respiratory"));
        assert_eq!(
            found.created_at.timestamp_millis(),
            saved.created_at.timestamp_millis()
        );
    }

    #[test]
    fn test_find_nonexistent() {
        let repo = make_repo();
        assert!(repo.find_by_id(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_specialty_is_optional() {
        let repo = make_repo();
        let saved = repo.record_consultation("p1", "headache", "See a doctor.", None).unwrap();
        let found = repo.find_by_id(saved.id).unwrap().unwrap();
        assert!(found.specialty.is_none());
    }

    #[test]
    fn test_list_for_patient_newest_first() {
        let repo = make_repo();
        repo.record_consultation("p1", "first", "a", None).unwrap();
        repo.record_consultation("p2", "other patient", "b", None).unwrap();
        repo.record_consultation("p1", "second", "c", None).unwrap();
        repo.record_consultation("p1", "third", "d", None).unwrap();

        let records = repo.list_for_patient("p1", 10).unwrap();
        let transcripts: Vec<&str> = records.iter().map(|r| r.transcript.as_str()).collect();
        assert_eq!(transcripts, vec!["third", "second", "first"]);

        let limited = repo.list_for_patient("p1", 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].transcript, "third");

        assert!(repo.list_for_patient("nobody", 10).unwrap().is_empty());
    }

    #[test]
    fn test_count() {
        let repo = make_repo();
        assert_eq!(repo.count().unwrap(), 0);
        repo.record_consultation("p1", "t", "r", None).unwrap();
        repo.record_consultation("p2", "t", "r", None).unwrap();
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.db");
        {
            let repo = ConsultationRepository::new(Arc::new(Database::new(&path).unwrap()));
            repo.record_consultation("p1", "t", "r", Some("eye")).unwrap();
        }
        let repo = ConsultationRepository::new(Arc::new(Database::new(&path).unwrap()));
        assert_eq!(repo.count().unwrap(), 1);
    }
}
