//! Database migration runner.
//!
//! Embeds the SQL migration files at compile time and executes them on
//! database open. `CREATE` statements use `IF NOT EXISTS`; migrations that
//! alter a table run only when the column they add is missing.

use crate::VerdantDb;
use crate::error::DatabaseError;

/// Initial schema: subjects, the finding log, four finding tables, preferences.
const MIGRATION_001: &str = include_str!("../migrations/001_initial.sql");
/// `subjects.active`, cleared for subjects the current catalogue no longer has.
const MIGRATION_002: &str = include_str!("../migrations/002_subject_retirement.sql");

impl VerdantDb {
    /// Run all embedded migrations in sequence.
    pub(crate) async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| DatabaseError::Migration(format!("001_initial: {e}")))?;
        if !self.has_column("subjects", "active").await? {
            self.conn
                .execute_batch(MIGRATION_002)
                .await
                .map_err(|e| DatabaseError::Migration(format!("002_subject_retirement: {e}")))?;
        }
        Ok(())
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2",
                libsql::params![table, column],
            )
            .await
            .map_err(|e| DatabaseError::Migration(format!("table_info({table}): {e}")))?;
        Ok(rows.next().await?.is_some())
    }
}
