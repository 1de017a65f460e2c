use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use erpflow_core::domain::employee::EmployeeId;
use erpflow_core::domain::leave::{LeaveId, LeaveRequest, LeaveType};
use erpflow_core::workflow::states::WorkflowState;

use super::rows::{lifecycle, parse_date, parse_optional_timestamp, parse_state, parse_timestamp};
use super::{LeaveRepository, RecordFilter, RepositoryError};
use crate::DbPool;

const ENTITY: &str = "leave";

const SELECT_COLUMNS: &str = "SELECT id, employee_id, leave_type, start_date, end_date, reason,
        status, approved_by, approved_at, rejected_at, remarks, version,
        created_at, updated_at, deleted_at
 FROM leave_requests";

pub struct SqlLeaveRepository {
    pool: DbPool,
}

impl SqlLeaveRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LeaveRepository for SqlLeaveRepository {
    async fn find_by_id(&self, id: &LeaveId) -> Result<Option<LeaveRequest>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(leave_from_row).transpose()
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<LeaveRequest>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        query.push(" WHERE deleted_at IS NULL");
        if let Some(status) = &filter.status {
            query.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(employee_id) = &filter.employee_id {
            query.push(" AND employee_id = ").push_bind(employee_id.clone());
        }
        query.push(" ORDER BY start_date DESC, created_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(leave_from_row).collect()
    }

    async fn insert(&self, leave: &LeaveRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO leave_requests (
                id, employee_id, leave_type, start_date, end_date, reason,
                status, approved_by, approved_at, rejected_at, remarks, version,
                created_at, updated_at, deleted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&leave.id.0)
        .bind(&leave.employee_id.0)
        .bind(leave.leave_type.as_str())
        .bind(leave.start_date.to_string())
        .bind(leave.end_date.to_string())
        .bind(&leave.reason)
        .bind(leave.status.as_str())
        .bind(leave.approved_by.as_deref())
        .bind(leave.approved_at.map(|at| at.to_rfc3339()))
        .bind(leave.rejected_at.map(|at| at.to_rfc3339()))
        .bind(leave.remarks.as_deref())
        .bind(leave.version)
        .bind(leave.created_at.to_rfc3339())
        .bind(leave.updated_at.to_rfc3339())
        .bind(leave.lifecycle.deleted_at().map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes the editable fields only; status and stamps belong to the
    /// workflow store.
    async fn update(
        &self,
        leave: &LeaveRequest,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE leave_requests SET
                employee_id = ?, leave_type = ?, start_date = ?, end_date = ?, reason = ?,
                updated_at = ?, version = version + 1
             WHERE id = ? AND version = ? AND deleted_at IS NULL",
        )
        .bind(&leave.employee_id.0)
        .bind(leave.leave_type.as_str())
        .bind(leave.start_date.to_string())
        .bind(leave.end_date.to_string())
        .bind(&leave.reason)
        .bind(leave.updated_at.to_rfc3339())
        .bind(&leave.id.0)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missed_update(&leave.id, expected_version).await?);
        }
        Ok(())
    }

    async fn has_approved_covering(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM leave_requests
             WHERE employee_id = ?
               AND status = 'Approved'
               AND deleted_at IS NULL
               AND start_date <= ?
               AND end_date >= ?",
        )
        .bind(&employee_id.0)
        .bind(date.to_string())
        .bind(date.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}

impl SqlLeaveRepository {
    async fn missed_update(
        &self,
        id: &LeaveId,
        expected_version: i64,
    ) -> Result<RepositoryError, RepositoryError> {
        let exists: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM leave_requests WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match exists {
            Some(_) => RepositoryError::VersionConflict {
                entity: ENTITY,
                id: id.0.clone(),
                expected: expected_version,
            },
            None => RepositoryError::not_found(ENTITY, &id.0),
        })
    }
}

fn leave_from_row(row: SqliteRow) -> Result<LeaveRequest, RepositoryError> {
    let leave_type_raw = row.try_get::<String, _>("leave_type")?;
    let leave_type = LeaveType::parse(&leave_type_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown leave type `{leave_type_raw}`")))?;

    Ok(LeaveRequest {
        id: LeaveId(row.try_get("id")?),
        employee_id: EmployeeId(row.try_get("employee_id")?),
        leave_type,
        start_date: parse_date("start_date", row.try_get("start_date")?)?,
        end_date: parse_date("end_date", row.try_get("end_date")?)?,
        reason: row.try_get("reason")?,
        status: parse_state("status", row.try_get("status")?)?,
        approved_by: row.try_get("approved_by")?,
        approved_at: parse_optional_timestamp("approved_at", row.try_get("approved_at")?)?,
        rejected_at: parse_optional_timestamp("rejected_at", row.try_get("rejected_at")?)?,
        remarks: row.try_get("remarks")?,
        version: row.try_get("version")?,
        lifecycle: lifecycle(&row)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use erpflow_core::domain::employee::EmployeeId;
    use erpflow_core::domain::leave::{LeaveDraft, LeaveId, LeaveRequest, LeaveStatus, LeaveType};

    use super::SqlLeaveRepository;
    use crate::repositories::test_support::{date, insert_employee, setup};
    use crate::repositories::{LeaveRepository, RecordFilter, RepositoryError};

    fn leave(id: &str, start: u32, end: u32) -> LeaveRequest {
        LeaveRequest::create(
            LeaveId(id.to_string()),
            LeaveDraft {
                employee_id: EmployeeId("EMP-1".to_string()),
                leave_type: LeaveType::Sick,
                start_date: date(2026, 3, start),
                end_date: date(2026, 3, end),
                reason: "flu".to_string(),
            },
            Utc::now(),
        )
        .expect("valid leave")
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict_not_a_silent_overwrite() {
        let pool = setup().await;
        insert_employee(&pool, "EMP-1", date(2025, 1, 1)).await;
        let repo = SqlLeaveRepository::new(pool);

        let mut request = leave("LV-1", 2, 3);
        repo.insert(&request).await.expect("insert");

        request.reason = "doctor's orders".to_string();
        repo.update(&request, 1).await.expect("first edit");

        let stale = repo.update(&request, 1).await.expect_err("version moved on");
        assert!(matches!(stale, RepositoryError::VersionConflict { expected: 1, .. }));

        let stored = repo.find_by_id(&request.id).await.expect("find").expect("row");
        assert_eq!(stored.version, 2);
        assert_eq!(stored.reason, "doctor's orders");

        let missing = repo.update(&leave("LV-404", 2, 2), 1).await.expect_err("no such row");
        assert!(matches!(missing, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn inserted_request_reads_back_unchanged() {
        let pool = setup().await;
        insert_employee(&pool, "EMP-1", date(2025, 1, 1)).await;
        let repo = SqlLeaveRepository::new(pool);

        let request = leave("LV-9", 9, 13);
        repo.insert(&request).await.expect("insert");

        let stored = repo.find_by_id(&request.id).await.expect("find");
        assert_eq!(stored, Some(request));
    }

    #[tokio::test]
    async fn only_approved_active_leave_counts_as_coverage() {
        let pool = setup().await;
        insert_employee(&pool, "EMP-1", date(2025, 1, 1)).await;
        let repo = SqlLeaveRepository::new(pool.clone());

        repo.insert(&leave("LV-1", 2, 4)).await.expect("pending leave");
        let employee = EmployeeId("EMP-1".to_string());
        assert!(!repo.has_approved_covering(&employee, date(2026, 3, 3)).await.expect("query"));

        sqlx::query("UPDATE leave_requests SET status = 'Approved' WHERE id = 'LV-1'")
            .execute(&pool)
            .await
            .expect("approve");
        assert!(repo.has_approved_covering(&employee, date(2026, 3, 4)).await.expect("query"));
        assert!(!repo.has_approved_covering(&employee, date(2026, 3, 5)).await.expect("query"));

        let approved = repo
            .list(&RecordFilter { status: Some("Approved".to_string()), employee_id: None })
            .await
            .expect("list");
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].status, LeaveStatus::Approved);

        sqlx::query("UPDATE leave_requests SET deleted_at = ? WHERE id = 'LV-1'")
            .bind(Utc::now().to_rfc3339())
            .execute(&pool)
            .await
            .expect("soft delete");
        assert!(!repo.has_approved_covering(&employee, date(2026, 3, 3)).await.expect("query"));
        assert!(repo.list(&RecordFilter::default()).await.expect("list").is_empty());
    }
}
