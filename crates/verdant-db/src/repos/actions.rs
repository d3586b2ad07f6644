//! Conservation action lifecycle.
//!
//! Rows are never updated. Completing an action appends a successor row that
//! points back at the original through `supersedes`; queries hide superseded
//! rows unless asked for history.

use verdant_core::entities::Finding;
use verdant_core::enums::FindingKind;
use verdant_core::ids::FindingId;

use crate::error::DatabaseError;
use crate::repos::findings::{insert_row, load_finding};
use crate::retry::with_retry;
use crate::store::{FindingStore, finish};

impl FindingStore {
    /// Mark an action completed by appending a superseding row.
    ///
    /// Returns the id of the new row. The original row stays untouched.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::NotFound` if `id` names no stored action.
    /// - `DatabaseError::ConstraintViolation` if `id` is not an action id, or
    ///   the action is already completed or already superseded.
    pub async fn complete_action(&self, id: FindingId) -> Result<FindingId, DatabaseError> {
        if id.kind() != FindingKind::ConservationAction {
            return Err(DatabaseError::ConstraintViolation(format!(
                "{id} is not a conservation action"
            )));
        }

        let successor = with_retry(self.retry(), "complete_action", || {
            self.complete_action_once(id)
        })
        .await?;

        tracing::info!(original = %id, successor = %successor, "completed conservation action");
        Ok(successor)
    }

    async fn complete_action_once(&self, id: FindingId) -> Result<FindingId, DatabaseError> {
        let db = self.db().write().await;
        let tx = db.conn().transaction().await?;
        let result = complete_in(&tx, id).await;
        finish(tx, result).await
    }
}

async fn complete_in(conn: &libsql::Connection, id: FindingId) -> Result<FindingId, DatabaseError> {
    let Some(Finding::ConservationAction(action)) =
        load_finding(conn, FindingKind::ConservationAction, id.seq()).await?
    else {
        return Err(DatabaseError::NotFound(format!("conservation action {id}")));
    };

    if let Some(successor) = superseded_by(conn, id.seq()).await? {
        return Err(DatabaseError::ConstraintViolation(format!(
            "{id} is already superseded by {successor}"
        )));
    }
    if action.completed {
        return Err(DatabaseError::ConstraintViolation(format!(
            "{id} is already completed"
        )));
    }

    // The successor keeps the original's subject even if that subject has
    // since been retired from the catalogue.
    insert_row(conn, &Finding::ConservationAction(action.completed_successor(id))).await
}

async fn superseded_by(
    conn: &libsql::Connection,
    seq: i64,
) -> Result<Option<FindingId>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT seq FROM conservation_actions WHERE supersedes = ?1",
            [seq],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(FindingId::new(
            FindingKind::ConservationAction,
            row.get::<i64>(0)?,
        ))),
        None => Ok(None),
    }
}
