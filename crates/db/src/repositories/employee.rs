use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use erpflow_core::domain::employee::{Employee, EmployeeId};

use super::rows::{lifecycle, parse_date, parse_decimal, parse_timestamp};
use super::{EmployeeRepository, RepositoryError};
use crate::DbPool;

const ENTITY: &str = "employee";

const SELECT_COLUMNS: &str = "SELECT id, employee_no, first_name, last_name, department, position,
        monthly_salary, hired_on, created_at, updated_at, deleted_at
 FROM employees";

pub struct SqlEmployeeRepository {
    pool: DbPool,
}

impl SqlEmployeeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EmployeeRepository for SqlEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(employee_from_row).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Employee>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE deleted_at IS NULL ORDER BY last_name ASC, first_name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(employee_from_row).collect()
    }

    async fn insert(&self, employee: &Employee) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employees (
                id, employee_no, first_name, last_name, department, position,
                monthly_salary, hired_on, created_at, updated_at, deleted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&employee.id.0)
        .bind(&employee.employee_no)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.department)
        .bind(&employee.position)
        .bind(employee.monthly_salary.to_string())
        .bind(employee.hired_on.to_string())
        .bind(employee.created_at.to_rfc3339())
        .bind(employee.updated_at.to_rfc3339())
        .bind(employee.lifecycle.deleted_at().map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, employee: &Employee) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE employees SET
                employee_no = ?, first_name = ?, last_name = ?, department = ?, position = ?,
                monthly_salary = ?, hired_on = ?, updated_at = ?
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&employee.employee_no)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.department)
        .bind(&employee.position)
        .bind(employee.monthly_salary.to_string())
        .bind(employee.hired_on.to_string())
        .bind(employee.updated_at.to_rfc3339())
        .bind(&employee.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(ENTITY, &employee.id.0));
        }
        Ok(())
    }

    async fn soft_delete(&self, id: &EmployeeId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE employees SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(at.to_rfc3339())
        .bind(at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(ENTITY, &id.0));
        }
        Ok(())
    }

    async fn restore(&self, id: &EmployeeId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE employees SET deleted_at = NULL, updated_at = ?
             WHERE id = ? AND deleted_at IS NOT NULL",
        )
        .bind(at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(ENTITY, &id.0));
        }
        Ok(())
    }
}

fn employee_from_row(row: SqliteRow) -> Result<Employee, RepositoryError> {
    Ok(Employee {
        id: EmployeeId(row.try_get("id")?),
        employee_no: row.try_get("employee_no")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        department: row.try_get("department")?,
        position: row.try_get("position")?,
        monthly_salary: parse_decimal("monthly_salary", row.try_get("monthly_salary")?)?,
        hired_on: parse_date("hired_on", row.try_get("hired_on")?)?,
        lifecycle: lifecycle(&row)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
