//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use triage_core::TriageError;

/// Run all pending migrations, recording each in `schema_migrations`.
pub fn run_migrations(conn: &Connection) -> Result<(), TriageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| TriageError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version = current_version(conn)?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: consultations");
    }

    Ok(())
}

/// Highest applied migration version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64, TriageError> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| TriageError::Storage(format!("Failed to query migration version: {}", e)))
}

/// Version 1: consultations table.
fn apply_v1(conn: &Connection) -> Result<(), TriageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS consultations (
            id              TEXT PRIMARY KEY NOT NULL,
            patient_id      TEXT NOT NULL,
            transcript      TEXT NOT NULL,
            ai_response     TEXT NOT NULL,
            specialty       TEXT,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_consultations_patient
            ON consultations (patient_id, created_at DESC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'consultations');
        ",
    )
    .map_err(|e| TriageError::Storage(format!("Migration v1 failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 1);

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_fresh_database_is_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, name TEXT, applied_at INTEGER);",
        )
        .unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);
    }
}
