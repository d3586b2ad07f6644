//! The finding store handle.
//!
//! `FindingStore` wraps [`VerdantDb`] in a `tokio::sync::RwLock`. Writers take
//! the write half for exactly one transaction, so a concurrent reader never
//! sees a partially written finding; readers share the read half. All repo
//! methods are implemented as `impl FindingStore` under `repos/`.

use tokio::sync::RwLock;
use verdant_config::StoreConfig;

use crate::error::DatabaseError;
use crate::retry::RetryConfig;
use crate::{IN_MEMORY, VerdantDb};

pub struct FindingStore {
    db: RwLock<VerdantDb>,
    retry: RetryConfig,
}

impl FindingStore {
    /// Open the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn open(config: &StoreConfig) -> Result<Self, DatabaseError> {
        let db = VerdantDb::open_local(&config.path).await?;
        Ok(Self::from_db(db, RetryConfig::from(config)))
    }

    /// Open a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if migrations fail.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let db = VerdantDb::open_local(IN_MEMORY).await?;
        Ok(Self::from_db(db, RetryConfig::default()))
    }

    #[must_use]
    pub fn from_db(db: VerdantDb, retry: RetryConfig) -> Self {
        Self {
            db: RwLock::new(db),
            retry,
        }
    }

    pub(crate) const fn db(&self) -> &RwLock<VerdantDb> {
        &self.db
    }

    pub(crate) const fn retry(&self) -> &RetryConfig {
        &self.retry
    }
}

/// Commit `tx` if `result` is `Ok`, otherwise roll it back and return the
/// original error.
pub(crate) async fn finish<T>(
    tx: libsql::Transaction,
    result: Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}
