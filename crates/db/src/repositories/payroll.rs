use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection};

use erpflow_core::domain::employee::EmployeeId;
use erpflow_core::domain::payroll::{PayPeriod, PayrollId, PayrollRecord};
use erpflow_core::payroll::DeductionLine;
use erpflow_core::workflow::states::WorkflowState;

use super::rows::{
    lifecycle, parse_date, parse_decimal, parse_optional_timestamp, parse_state, parse_timestamp,
};
use super::{PayrollRepository, RecordFilter, RepositoryError};
use crate::DbPool;

const ENTITY: &str = "payroll";

const SELECT_COLUMNS: &str = "SELECT id, employee_id, period_start, period_end,
        gross_pay, total_deductions, taxable_income, withholding_tax, net_pay,
        status, approver_id, processed_by, submitted_at, approved_at, rejected_at,
        processed_at, remarks, version, created_at, updated_at, deleted_at
 FROM payrolls";

pub struct SqlPayrollRepository {
    pool: DbPool,
}

impl SqlPayrollRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_deductions(&self, payroll_id: &str) -> Result<Vec<DeductionLine>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT code, employee_share, employer_share
             FROM payroll_deductions
             WHERE payroll_id = ?
             ORDER BY id ASC",
        )
        .bind(payroll_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(DeductionLine {
                    code: row.try_get("code")?,
                    employee_share: parse_decimal("employee_share", row.try_get("employee_share")?)?,
                    employer_share: parse_decimal("employer_share", row.try_get("employer_share")?)?,
                })
            })
            .collect()
    }
}

async fn replace_deductions(
    conn: &mut SqliteConnection,
    payroll: &PayrollRecord,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM payroll_deductions WHERE payroll_id = ?")
        .bind(&payroll.id.0)
        .execute(&mut *conn)
        .await?;

    for line in &payroll.deductions {
        sqlx::query(
            "INSERT INTO payroll_deductions (payroll_id, code, employee_share, employer_share)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&payroll.id.0)
        .bind(&line.code)
        .bind(line.employee_share.to_string())
        .bind(line.employer_share.to_string())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl PayrollRepository for SqlPayrollRepository {
    async fn find_by_id(&self, id: &PayrollId) -> Result<Option<PayrollRecord>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut payroll = payroll_from_row(row)?;
        payroll.deductions = self.load_deductions(&payroll.id.0).await?;
        Ok(Some(payroll))
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<PayrollRecord>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        query.push(" WHERE deleted_at IS NULL");
        if let Some(status) = &filter.status {
            query.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(employee_id) = &filter.employee_id {
            query.push(" AND employee_id = ").push_bind(employee_id.clone());
        }
        query.push(" ORDER BY period_start DESC, created_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        let mut payrolls = Vec::with_capacity(rows.len());
        for row in rows {
            let mut payroll = payroll_from_row(row)?;
            payroll.deductions = self.load_deductions(&payroll.id.0).await?;
            payrolls.push(payroll);
        }
        Ok(payrolls)
    }

    async fn insert(&self, payroll: &PayrollRecord) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO payrolls (
                id, employee_id, period_start, period_end,
                gross_pay, total_deductions, taxable_income, withholding_tax, net_pay,
                status, approver_id, processed_by, submitted_at, approved_at, rejected_at,
                processed_at, remarks, version, created_at, updated_at, deleted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&payroll.id.0)
        .bind(&payroll.employee_id.0)
        .bind(payroll.period.start.to_string())
        .bind(payroll.period.end.to_string())
        .bind(payroll.gross_pay.to_string())
        .bind(payroll.total_deductions.to_string())
        .bind(payroll.taxable_income.to_string())
        .bind(payroll.withholding_tax.to_string())
        .bind(payroll.net_pay.to_string())
        .bind(payroll.status.as_str())
        .bind(payroll.approver_id.as_deref())
        .bind(payroll.processed_by.as_deref())
        .bind(payroll.submitted_at.map(|at| at.to_rfc3339()))
        .bind(payroll.approved_at.map(|at| at.to_rfc3339()))
        .bind(payroll.rejected_at.map(|at| at.to_rfc3339()))
        .bind(payroll.processed_at.map(|at| at.to_rfc3339()))
        .bind(payroll.remarks.as_deref())
        .bind(payroll.version)
        .bind(payroll.created_at.to_rfc3339())
        .bind(payroll.updated_at.to_rfc3339())
        .bind(payroll.lifecycle.deleted_at().map(|at| at.to_rfc3339()))
        .execute(&mut *tx)
        .await?;

        replace_deductions(&mut *tx, payroll).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update(
        &self,
        payroll: &PayrollRecord,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE payrolls SET
                period_start = ?, period_end = ?, gross_pay = ?, total_deductions = ?,
                taxable_income = ?, withholding_tax = ?, net_pay = ?, updated_at = ?,
                version = version + 1
             WHERE id = ? AND version = ? AND deleted_at IS NULL",
        )
        .bind(payroll.period.start.to_string())
        .bind(payroll.period.end.to_string())
        .bind(payroll.gross_pay.to_string())
        .bind(payroll.total_deductions.to_string())
        .bind(payroll.taxable_income.to_string())
        .bind(payroll.withholding_tax.to_string())
        .bind(payroll.net_pay.to_string())
        .bind(payroll.updated_at.to_rfc3339())
        .bind(&payroll.id.0)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM payrolls WHERE id = ? AND deleted_at IS NULL",
            )
            .bind(&payroll.id.0)
            .fetch_optional(&mut *tx)
            .await?;
            return Err(match current {
                Some(_) => RepositoryError::VersionConflict {
                    entity: ENTITY,
                    id: payroll.id.0.clone(),
                    expected: expected_version,
                },
                None => RepositoryError::not_found(ENTITY, &payroll.id.0),
            });
        }

        replace_deductions(&mut *tx, payroll).await?;

        tx.commit().await?;
        Ok(())
    }
}

fn payroll_from_row(row: SqliteRow) -> Result<PayrollRecord, RepositoryError> {
    Ok(PayrollRecord {
        id: PayrollId(row.try_get("id")?),
        employee_id: EmployeeId(row.try_get("employee_id")?),
        period: PayPeriod {
            start: parse_date("period_start", row.try_get("period_start")?)?,
            end: parse_date("period_end", row.try_get("period_end")?)?,
        },
        gross_pay: parse_decimal("gross_pay", row.try_get("gross_pay")?)?,
        total_deductions: parse_decimal("total_deductions", row.try_get("total_deductions")?)?,
        taxable_income: parse_decimal("taxable_income", row.try_get("taxable_income")?)?,
        withholding_tax: parse_decimal("withholding_tax", row.try_get("withholding_tax")?)?,
        net_pay: parse_decimal("net_pay", row.try_get("net_pay")?)?,
        deductions: Vec::new(),
        status: parse_state("status", row.try_get("status")?)?,
        approver_id: row.try_get("approver_id")?,
        processed_by: row.try_get("processed_by")?,
        submitted_at: parse_optional_timestamp("submitted_at", row.try_get("submitted_at")?)?,
        approved_at: parse_optional_timestamp("approved_at", row.try_get("approved_at")?)?,
        rejected_at: parse_optional_timestamp("rejected_at", row.try_get("rejected_at")?)?,
        processed_at: parse_optional_timestamp("processed_at", row.try_get("processed_at")?)?,
        remarks: row.try_get("remarks")?,
        version: row.try_get("version")?,
        lifecycle: lifecycle(&row)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
