//! Mirrors the reference catalogue into the `subjects` table so foreign keys
//! can enforce referential consistency.
//!
//! The mirror tracks the catalogue of the current run exactly: subjects the
//! catalogue no longer carries are marked inactive rather than deleted, since
//! older findings still reference them.

use libsql::Value;
use verdant_catalog::Catalogue;

use crate::error::DatabaseError;
use crate::helpers::to_json;
use crate::retry::with_retry;
use crate::store::{FindingStore, finish};

impl FindingStore {
    /// Upsert every catalogue subject as active and retire the rest. Returns
    /// how many rows were written.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any row is rejected; nothing is written then.
    pub async fn sync_catalogue(&self, catalogue: &Catalogue) -> Result<usize, DatabaseError> {
        let (written, retired) = with_retry(self.retry(), "sync_catalogue", || async move {
            let db = self.db().write().await;
            let tx = db.conn().transaction().await?;
            let result = mirror_subjects(&tx, catalogue).await;
            finish(tx, result).await
        })
        .await?;

        if retired > 0 {
            tracing::info!(retired, "subjects missing from the catalogue were retired");
        }
        tracing::debug!(subjects = written, "synced catalogue into store");
        Ok(written)
    }
}

async fn mirror_subjects(
    conn: &libsql::Connection,
    catalogue: &Catalogue,
) -> Result<(usize, i64), DatabaseError> {
    conn.execute("UPDATE subjects SET active = 0", ()).await?;

    let mut written = 0;
    for subject in catalogue.iter() {
        conn.execute(
            "INSERT INTO subjects (id, common_name, scientific_name, category, description,
                conservation_status, habitat, threats, recommended_actions, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)
             ON CONFLICT(id) DO UPDATE SET
                common_name = excluded.common_name,
                scientific_name = excluded.scientific_name,
                category = excluded.category,
                description = excluded.description,
                conservation_status = excluded.conservation_status,
                habitat = excluded.habitat,
                threats = excluded.threats,
                recommended_actions = excluded.recommended_actions,
                active = 1",
            libsql::params_from_iter(vec![
                Value::Text(subject.id.clone()),
                Value::Text(subject.common_name.clone()),
                Value::Text(subject.scientific_name.clone()),
                Value::Text(subject.category.as_str().to_string()),
                Value::Text(subject.description.clone()),
                Value::Text(subject.conservation_status.as_str().to_string()),
                Value::Text(subject.habitat.clone()),
                Value::Text(to_json(&subject.threats)?),
                Value::Text(to_json(&subject.recommended_actions)?),
            ]),
        )
        .await?;
        written += 1;
    }

    let mut rows = conn
        .query("SELECT COUNT(*) FROM subjects WHERE active = 0", ())
        .await?;
    let retired = match rows.next().await? {
        Some(row) => row.get::<i64>(0)?,
        None => 0,
    };
    Ok((written, retired))
}
