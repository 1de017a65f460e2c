use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

use erpflow_core::audit::AuditEntry;
use erpflow_core::workflow::states::{
    EntityKind, FieldValue, TransitionOutcome, WorkflowSnapshot, WorkflowStatus,
};

use super::audit_log::insert_entry;
use super::rows::lifecycle;
use super::RepositoryError;
use crate::DbPool;

/// Where each workflow entity keeps its status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkflowTable {
    pub table: &'static str,
    pub status_column: &'static str,
}

pub fn table_for(kind: EntityKind) -> WorkflowTable {
    match kind {
        EntityKind::Leave => WorkflowTable { table: "leave_requests", status_column: "status" },
        EntityKind::Payroll => WorkflowTable { table: "payrolls", status_column: "status" },
        EntityKind::ScmRequest => {
            WorkflowTable { table: "scm_requests", status_column: "request_status" }
        }
        EntityKind::BranchDistribution => {
            WorkflowTable { table: "branch_distribution_requests", status_column: "status" }
        }
    }
}

/// Status persistence shared by every workflow entity. Reads and writes only
/// the status, stamp, lifecycle and version columns.
pub struct SqlWorkflowStore {
    pool: DbPool,
}

impl SqlWorkflowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Loads the current status, including soft-deleted rows so that
    /// `restore` can be evaluated.
    pub async fn load_snapshot(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<WorkflowSnapshot<WorkflowStatus>>, RepositoryError> {
        let table = table_for(kind);
        let row = sqlx::query(&format!(
            "SELECT {status} AS status, version, deleted_at FROM {table} WHERE id = ?",
            status = table.status_column,
            table = table.table,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("status")?;
        let status = WorkflowStatus::parse(kind, &raw).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown {} status `{raw}`", kind.as_str()))
        })?;

        Ok(Some(WorkflowSnapshot {
            kind,
            entity_id: id.to_string(),
            status,
            lifecycle: lifecycle(&row)?,
            version: row.try_get("version")?,
        }))
    }

    /// Writes the outcome guarded by the snapshot version and appends the
    /// audit entry, if any, in the same transaction. Returns the new version.
    pub async fn apply_outcome(
        &self,
        outcome: &TransitionOutcome<WorkflowStatus>,
        expected_version: i64,
        audit: Option<&AuditEntry>,
    ) -> Result<i64, RepositoryError> {
        let table = table_for(outcome.kind);
        let mut tx = self.pool.begin().await?;

        let mut query = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", table.table));
        query.push(table.status_column).push(" = ").push_bind(outcome.to.as_str());
        for update in &outcome.updates {
            let column = update.column.as_str();
            let value = match &update.value {
                FieldValue::Timestamp(at) => at.to_rfc3339(),
                FieldValue::Text(text) => text.clone(),
            };
            if update.column.is_write_once() {
                query
                    .push(format!(", {column} = COALESCE({column}, "))
                    .push_bind(value)
                    .push(")");
            } else {
                query.push(format!(", {column} = ")).push_bind(value);
            }
        }
        if outcome.restores {
            query.push(", deleted_at = NULL");
        }
        query
            .push(", updated_at = ")
            .push_bind(outcome.at.to_rfc3339())
            .push(", version = version + 1 WHERE id = ")
            .push_bind(outcome.entity_id.clone())
            .push(" AND version = ")
            .push_bind(expected_version);
        if outcome.restores {
            query.push(" AND deleted_at IS NOT NULL");
        } else {
            query.push(" AND deleted_at IS NULL");
        }

        let result = query.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar(&format!("SELECT version FROM {} WHERE id = ?", table.table))
                    .bind(&outcome.entity_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match exists {
                Some(_) => RepositoryError::VersionConflict {
                    entity: outcome.kind.as_str(),
                    id: outcome.entity_id.clone(),
                    expected: expected_version,
                },
                None => RepositoryError::not_found(outcome.kind.as_str(), &outcome.entity_id),
            });
        }

        if let Some(entry) = audit {
            insert_entry(&mut *tx, entry).await?;
        }

        tx.commit().await?;
        Ok(expected_version + 1)
    }

    /// Marks an active row deleted. Deleting an already-deleted row is
    /// reported as not found.
    pub async fn soft_delete(
        &self,
        kind: EntityKind,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let table = table_for(kind);
        let result = sqlx::query(&format!(
            "UPDATE {} SET deleted_at = ?, updated_at = ?, version = version + 1
             WHERE id = ? AND deleted_at IS NULL",
            table.table
        ))
        .bind(at.to_rfc3339())
        .bind(at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(kind.as_str(), id));
        }
        Ok(())
    }
}
