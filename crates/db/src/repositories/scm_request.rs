use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection};

use erpflow_core::domain::scm_request::{ScmRequest, ScmRequestId, ScmRequestItem};
use erpflow_core::workflow::states::WorkflowState;

use super::rows::{lifecycle, parse_decimal, parse_optional_timestamp, parse_state, parse_timestamp};
use super::{RecordFilter, RepositoryError, ScmRequestRepository};
use crate::DbPool;

const ENTITY: &str = "scm_request";

const SELECT_COLUMNS: &str = "SELECT id, request_no, department, purpose, request_status,
        prepared_by, approved_by, submitted_at, approved_at, rejected_at, cancelled_at,
        cancellation_reason, remarks, total_amount, version, created_at, updated_at, deleted_at
 FROM scm_requests";

pub struct SqlScmRequestRepository {
    pool: DbPool,
}

impl SqlScmRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, request_id: &str) -> Result<Vec<ScmRequestItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT item_name, unit, quantity, unit_cost, amount
             FROM scm_request_items
             WHERE scm_request_id = ?
             ORDER BY line_no ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ScmRequestItem {
                    item_name: row.try_get("item_name")?,
                    unit: row.try_get("unit")?,
                    quantity: parse_decimal("quantity", row.try_get("quantity")?)?,
                    unit_cost: parse_decimal("unit_cost", row.try_get("unit_cost")?)?,
                    amount: parse_decimal("amount", row.try_get("amount")?)?,
                })
            })
            .collect()
    }
}

async fn replace_items(
    conn: &mut SqliteConnection,
    request: &ScmRequest,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM scm_request_items WHERE scm_request_id = ?")
        .bind(&request.id.0)
        .execute(&mut *conn)
        .await?;

    for (line_no, item) in request.items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO scm_request_items (
                scm_request_id, line_no, item_name, unit, quantity, unit_cost, amount
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(line_no as i64 + 1)
        .bind(&item.item_name)
        .bind(&item.unit)
        .bind(item.quantity.to_string())
        .bind(item.unit_cost.to_string())
        .bind(item.amount.to_string())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ScmRequestRepository for SqlScmRequestRepository {
    async fn find_by_id(&self, id: &ScmRequestId) -> Result<Option<ScmRequest>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut request = scm_request_from_row(row)?;
        request.items = self.load_items(&request.id.0).await?;
        Ok(Some(request))
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ScmRequest>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        query.push(" WHERE deleted_at IS NULL");
        if let Some(status) = &filter.status {
            query.push(" AND request_status = ").push_bind(status.clone());
        }
        query.push(" ORDER BY created_at DESC, request_no ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            let mut request = scm_request_from_row(row)?;
            request.items = self.load_items(&request.id.0).await?;
            requests.push(request);
        }
        Ok(requests)
    }

    async fn insert(&self, request: &ScmRequest) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO scm_requests (
                id, request_no, department, purpose, request_status,
                prepared_by, approved_by, submitted_at, approved_at, rejected_at, cancelled_at,
                cancellation_reason, remarks, total_amount, version, created_at, updated_at,
                deleted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.request_no)
        .bind(&request.department)
        .bind(&request.purpose)
        .bind(request.request_status.as_str())
        .bind(&request.prepared_by)
        .bind(request.approved_by.as_deref())
        .bind(request.submitted_at.map(|at| at.to_rfc3339()))
        .bind(request.approved_at.map(|at| at.to_rfc3339()))
        .bind(request.rejected_at.map(|at| at.to_rfc3339()))
        .bind(request.cancelled_at.map(|at| at.to_rfc3339()))
        .bind(request.cancellation_reason.as_deref())
        .bind(request.remarks.as_deref())
        .bind(request.total_amount.to_string())
        .bind(request.version)
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .bind(request.lifecycle.deleted_at().map(|at| at.to_rfc3339()))
        .execute(&mut *tx)
        .await?;

        replace_items(&mut *tx, request).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update(
        &self,
        request: &ScmRequest,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE scm_requests SET
                request_no = ?, department = ?, purpose = ?, prepared_by = ?,
                total_amount = ?, updated_at = ?, version = version + 1
             WHERE id = ? AND version = ? AND deleted_at IS NULL",
        )
        .bind(&request.request_no)
        .bind(&request.department)
        .bind(&request.purpose)
        .bind(&request.prepared_by)
        .bind(request.total_amount.to_string())
        .bind(request.updated_at.to_rfc3339())
        .bind(&request.id.0)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM scm_requests WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(&request.id.0)
            .fetch_optional(&mut *tx)
            .await?;
            return Err(match current {
                Some(_) => RepositoryError::VersionConflict {
                    entity: ENTITY,
                    id: request.id.0.clone(),
                    expected: expected_version,
                },
                None => RepositoryError::not_found(ENTITY, &request.id.0),
            });
        }

        replace_items(&mut *tx, request).await?;

        tx.commit().await?;
        Ok(())
    }
}

fn scm_request_from_row(row: SqliteRow) -> Result<ScmRequest, RepositoryError> {
    Ok(ScmRequest {
        id: ScmRequestId(row.try_get("id")?),
        request_no: row.try_get("request_no")?,
        department: row.try_get("department")?,
        purpose: row.try_get("purpose")?,
        request_status: parse_state("request_status", row.try_get("request_status")?)?,
        prepared_by: row.try_get("prepared_by")?,
        approved_by: row.try_get("approved_by")?,
        submitted_at: parse_optional_timestamp("submitted_at", row.try_get("submitted_at")?)?,
        approved_at: parse_optional_timestamp("approved_at", row.try_get("approved_at")?)?,
        rejected_at: parse_optional_timestamp("rejected_at", row.try_get("rejected_at")?)?,
        cancelled_at: parse_optional_timestamp("cancelled_at", row.try_get("cancelled_at")?)?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        remarks: row.try_get("remarks")?,
        total_amount: parse_decimal("total_amount", row.try_get("total_amount")?)?,
        items: Vec::new(),
        version: row.try_get("version")?,
        lifecycle: lifecycle(&row)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
