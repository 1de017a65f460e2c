use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteExecutor};

use erpflow_core::audit::{AuditEntry, AuditQuery};
use erpflow_core::workflow::states::{EntityKind, WorkflowAction};

use super::rows::parse_timestamp;
use super::{AuditLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditLogRepository {
    pool: DbPool,
}

impl SqlAuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Appends one audit row on any executor, so callers can write the entry in
/// the same transaction as the status change it records.
pub(crate) async fn insert_entry<'e, E>(executor: E, entry: &AuditEntry) -> Result<(), RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO audit_logs (id, entity_kind, entity_id, user_id, action, remarks, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(entry.entity_kind.as_str())
    .bind(&entry.entity_id)
    .bind(&entry.actor_id)
    .bind(entry.action.as_str())
    .bind(entry.remarks.as_deref())
    .bind(entry.created_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl AuditLogRepository for SqlAuditLogRepository {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        insert_entry(&self.pool, entry).await
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, entity_kind, entity_id, user_id, action, remarks, created_at
             FROM audit_logs WHERE 1 = 1",
        );
        if let Some(kind) = query.entity_kind {
            builder.push(" AND entity_kind = ").push_bind(kind.as_str());
        }
        if let Some(entity_id) = &query.entity_id {
            builder.push(" AND entity_id = ").push_bind(entity_id.clone());
        }
        if let Some(actor_id) = &query.actor_id {
            builder.push(" AND user_id = ").push_bind(actor_id.clone());
        }
        builder.push(" ORDER BY created_at ASC, rowid ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(entry_from_row).collect()
    }
}

fn entry_from_row(row: SqliteRow) -> Result<AuditEntry, RepositoryError> {
    let kind_raw = row.try_get::<String, _>("entity_kind")?;
    let entity_kind = kind_raw
        .parse::<EntityKind>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let action_raw = row.try_get::<String, _>("action")?;
    let action = action_raw
        .parse::<WorkflowAction>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(AuditEntry {
        id: row.try_get("id")?,
        entity_kind,
        entity_id: row.try_get("entity_id")?,
        actor_id: row.try_get("user_id")?,
        action,
        remarks: row.try_get("remarks")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
