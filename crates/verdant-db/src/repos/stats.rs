//! Aggregate statistics over the finding store.

use chrono::{Duration, Utc};
use verdant_core::entities::StatsSummary;
use verdant_core::enums::{Category, FindingKind};

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, parse_enum};
use crate::retry::with_retry;
use crate::store::FindingStore;

/// Window for `StatsSummary::recent_count`.
const RECENT_DAYS: i64 = 7;

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

impl FindingStore {
    /// Totals, per-kind and per-category counts, and the number of findings
    /// created in the last seven days.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any aggregate query fails.
    pub async fn aggregate_stats(&self) -> Result<StatsSummary, DatabaseError> {
        with_retry(self.retry(), "aggregate_stats", || async move {
            let db = self.db().read().await;
            aggregate(db.conn()).await
        })
        .await
    }
}

async fn aggregate(conn: &libsql::Connection) -> Result<StatsSummary, DatabaseError> {
    let mut summary = StatsSummary::default();

    let mut rows = conn
        .query("SELECT kind, COUNT(*) FROM finding_log GROUP BY kind", ())
        .await?;
    while let Some(row) = rows.next().await? {
        let kind: FindingKind = parse_enum(&row.get::<String>(0)?)?;
        let n = count(row.get::<i64>(1)?);
        summary.by_kind.insert(kind, n);
        summary.total += n;
    }

    let mut rows = conn
        .query(
            "SELECT s.category, COUNT(*) FROM species_discoveries d
             JOIN subjects s ON s.id = d.subject_ref
             GROUP BY s.category",
            (),
        )
        .await?;
    while let Some(row) = rows.next().await? {
        let category: Category = parse_enum(&row.get::<String>(0)?)?;
        summary.by_category.insert(category, count(row.get::<i64>(1)?));
    }

    let cutoff = format_timestamp(&(Utc::now() - Duration::days(RECENT_DAYS)));
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM finding_log WHERE created_at >= ?1",
            [cutoff],
        )
        .await?;
    let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
    summary.recent_count = count(row.get::<i64>(0)?);

    Ok(summary)
}
