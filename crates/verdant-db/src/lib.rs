//! # verdant-db
//!
//! The Verdant finding store: durable, queryable storage for species
//! discoveries, audio analyses, ecosystem assessments, and conservation
//! actions, plus a key-value preference table.
//!
//! Uses the `libsql` crate (C `SQLite` fork) as a local embedded database.
//! [`VerdantDb`] owns the raw connection and schema; [`FindingStore`] wraps it
//! with the read/write locking, transactions, and retry policy that the rest
//! of Verdant relies on.

pub mod error;
mod filter;
pub mod helpers;
mod migrations;
mod repos;
pub mod retry;
mod store;

#[cfg(test)]
mod test_support;

pub use error::DatabaseError;
pub use filter::FindingFilter;
pub use repos::findings::SavedBundle;
pub use retry::RetryConfig;
pub use store::FindingStore;

use std::path::Path;

use libsql::Builder;

/// In-memory database path, used by tests and throwaway sessions.
pub const IN_MEMORY: &str = ":memory:";

/// Raw database handle: one libSQL database plus its connection.
pub struct VerdantDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl VerdantDb {
    /// Open a local database at the given path, creating parent directories
    /// for file-backed stores.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created, the
    /// database cannot be opened, or migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        if path != IN_MEMORY {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Foreign keys are per-connection in SQLite
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let verdant_db = Self { db, conn };
        verdant_db.run_migrations().await?;
        tracing::debug!(path, "opened finding store");
        Ok(verdant_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> VerdantDb {
        VerdantDb::open_local(IN_MEMORY).await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;

        let tables = [
            "subjects",
            "finding_log",
            "species_discoveries",
            "audio_analyses",
            "ecosystem_assessments",
            "conservation_actions",
            "preferences",
        ];
        for table in &tables {
            let mut rows = db
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap();
            assert!(row.is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn idempotent_migrations() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO finding_log (kind, created_at) VALUES ('species_discovery', '2026-01-01T00:00:00Z')",
                (),
            )
            .await
            .unwrap();
        let seq = db.conn().last_insert_rowid();

        let result = db
            .conn()
            .execute(
                "INSERT INTO species_discoveries (seq, subject_ref, confidence, media_ref, conservation_status_snapshot, created_at)
                 VALUES (?1, 'no-such-subject', 0.5, 'x.jpg', 'unknown', '2026-01-01T00:00:00Z')",
                [seq],
            )
            .await;
        let err = DatabaseError::from(result.unwrap_err());
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn check_constraints_back_up_score_ranges() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO finding_log (kind, created_at) VALUES ('audio_analysis', '2026-01-01T00:00:00Z')",
                (),
            )
            .await
            .unwrap();
        let seq = db.conn().last_insert_rowid();

        let result = db
            .conn()
            .execute(
                "INSERT INTO audio_analyses (seq, media_ref, duration_seconds, biodiversity_score, environmental_health, created_at)
                 VALUES (?1, 'a.wav', 10.0, 1.5, 'good', '2026-01-01T00:00:00Z')",
                [seq],
            )
            .await;
        assert!(result.is_err(), "biodiversity_score above 1 should be rejected");
    }

    #[tokio::test]
    async fn file_backed_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("verdant.db");
        VerdantDb::open_local(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
    }
}
