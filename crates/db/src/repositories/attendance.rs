use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use erpflow_core::domain::attendance::{AttendanceId, AttendanceRecord, AttendanceStatus};
use erpflow_core::domain::employee::EmployeeId;

use super::rows::{format_time, parse_date, parse_optional_time, parse_timestamp};
use super::{AttendanceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAttendanceRepository {
    pool: DbPool,
}

impl SqlAttendanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AttendanceRepository for SqlAttendanceRepository {
    async fn find(
        &self,
        employee_id: &EmployeeId,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, employee_id, work_date, status, time_in, time_out, remarks, created_at
             FROM attendance
             WHERE employee_id = ? AND work_date = ?",
        )
        .bind(&employee_id.0)
        .bind(work_date.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(attendance_from_row).transpose()
    }

    async fn list(
        &self,
        employee_id: Option<&EmployeeId>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, employee_id, work_date, status, time_in, time_out, remarks, created_at
             FROM attendance WHERE 1 = 1",
        );
        if let Some(employee_id) = employee_id {
            query.push(" AND employee_id = ").push_bind(employee_id.0.clone());
        }
        if let Some(from) = from {
            query.push(" AND work_date >= ").push_bind(from.to_string());
        }
        if let Some(to) = to {
            query.push(" AND work_date <= ").push_bind(to.to_string());
        }
        query.push(" ORDER BY work_date ASC, employee_id ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(attendance_from_row).collect()
    }

    async fn insert(&self, record: &AttendanceRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO attendance (
                id, employee_id, work_date, status, time_in, time_out, remarks, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.employee_id.0)
        .bind(record.work_date.to_string())
        .bind(record.status.as_str())
        .bind(format_time(record.time_in))
        .bind(format_time(record.time_out))
        .bind(record.remarks.as_deref())
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_if_absent(&self, record: &AttendanceRecord) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO attendance (
                id, employee_id, work_date, status, time_in, time_out, remarks, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(employee_id, work_date) DO NOTHING",
        )
        .bind(&record.id.0)
        .bind(&record.employee_id.0)
        .bind(record.work_date.to_string())
        .bind(record.status.as_str())
        .bind(format_time(record.time_in))
        .bind(format_time(record.time_out))
        .bind(record.remarks.as_deref())
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn attendance_from_row(row: SqliteRow) -> Result<AttendanceRecord, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = AttendanceStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown attendance status `{status_raw}`"))
    })?;

    Ok(AttendanceRecord {
        id: AttendanceId(row.try_get("id")?),
        employee_id: EmployeeId(row.try_get("employee_id")?),
        work_date: parse_date("work_date", row.try_get("work_date")?)?,
        status,
        time_in: parse_optional_time("time_in", row.try_get("time_in")?)?,
        time_out: parse_optional_time("time_out", row.try_get("time_out")?)?,
        remarks: row.try_get("remarks")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
