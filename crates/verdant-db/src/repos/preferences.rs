//! Key-value preferences. Last write wins.

use std::fmt::Display;
use std::str::FromStr;

use chrono::Utc;

use crate::error::DatabaseError;
use crate::helpers::format_timestamp;
use crate::retry::with_retry;
use crate::store::{FindingStore, finish};

impl FindingStore {
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        with_retry(self.retry(), "get_preference", || async move {
            let db = self.db().read().await;
            let mut rows = db
                .conn()
                .query("SELECT value FROM preferences WHERE key = ?1", [key])
                .await?;
            match rows.next().await? {
                Some(row) => Ok(Some(row.get::<String>(0)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Read a preference and parse it as `T`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::PreferenceType` if the stored string does not
    /// parse as `T`.
    pub async fn get_preference_as<T>(&self, key: &str) -> Result<Option<T>, DatabaseError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get_preference(key)
            .await?
            .map(|raw| {
                raw.parse::<T>().map_err(|e| DatabaseError::PreferenceType {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Insert or overwrite a preference.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        if key.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation(
                "preference key must not be blank".into(),
            ));
        }

        with_retry(self.retry(), "set_preference", || async move {
            let db = self.db().write().await;
            let tx = db.conn().transaction().await?;
            let result = tx
                .execute(
                    "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                    updated_at = excluded.updated_at",
                    libsql::params![key, value, format_timestamp(&Utc::now())],
                )
                .await
                .map(|_| ())
                .map_err(DatabaseError::from);
            finish(tx, result).await
        })
        .await?;

        tracing::debug!(key, "set preference");
        Ok(())
    }
}
