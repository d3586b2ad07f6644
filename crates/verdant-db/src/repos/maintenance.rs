//! Bulk erase.

use crate::error::DatabaseError;
use crate::retry::with_retry;
use crate::store::{FindingStore, finish};

impl FindingStore {
    /// Delete every finding and preference. The catalogue mirror is kept.
    ///
    /// Returns the number of findings removed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the erase fails; nothing is deleted then.
    pub async fn erase_all(&self) -> Result<u64, DatabaseError> {
        let removed = with_retry(self.retry(), "erase_all", || async move {
            let db = self.db().write().await;
            let tx = db.conn().transaction().await?;
            let result = erase(&tx).await;
            finish(tx, result).await
        })
        .await?;

        tracing::info!(removed, "erased all findings and preferences");
        Ok(removed)
    }
}

async fn erase(conn: &libsql::Connection) -> Result<u64, DatabaseError> {
    for table in [
        "conservation_actions",
        "species_discoveries",
        "audio_analyses",
        "ecosystem_assessments",
    ] {
        conn.execute(&format!("DELETE FROM {table}"), ()).await?;
    }
    let removed = conn.execute("DELETE FROM finding_log", ()).await?;
    conn.execute("DELETE FROM preferences", ()).await?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::filter::FindingFilter;
    use crate::test_support::{action, audio, discovery, seeded_store};

    #[tokio::test]
    async fn erase_clears_findings_and_preferences_but_keeps_catalogue() {
        let (store, catalogue) = seeded_store().await;
        store
            .save_bundle(
                &discovery(&catalogue, "monarch-butterfly", 0.88),
                &[action(Some("monarch-butterfly"), "Plant native milkweed")],
            )
            .await
            .unwrap();
        store.save(&audio(0.7, &[])).await.unwrap();
        store.set_preference("theme", "dark").await.unwrap();

        let removed = store.erase_all().await.unwrap();
        assert_eq!(removed, 3);

        let stats = store.aggregate_stats().await.unwrap();
        assert_eq!(stats.total, 0);
        assert!(
            store
                .query(None, &FindingFilter::default(), 10, 0)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(store.get_preference("theme").await.unwrap(), None);

        // Subjects are still there: a new discovery referencing one succeeds.
        store
            .save(&discovery(&catalogue, "monarch-butterfly", 0.9))
            .await
            .unwrap();
    }
}
