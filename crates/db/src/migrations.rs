use sqlx::migrate::{MigrateError, Migrator};
use sqlx::Row;

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Versions recorded in `_sqlx_migrations`, oldest first. Empty before the
/// first run.
pub async fn applied_versions(pool: &DbPool) -> Result<Vec<i64>, sqlx::Error> {
    let exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if exists == 0 {
        return Ok(Vec::new());
    }

    let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1 ORDER BY version")
        .fetch_all(pool)
        .await?;
    rows.iter().map(|row| row.try_get::<i64, _>("version")).collect()
}

pub fn known_versions() -> Vec<i64> {
    MIGRATOR
        .iter()
        .filter(|migration| migration.migration_type.is_up_migration())
        .map(|migration| migration.version)
        .collect()
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{applied_versions, known_versions, run_pending};
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "employees",
        "attendance",
        "leave_requests",
        "payrolls",
        "payroll_deductions",
        "scm_requests",
        "scm_request_items",
        "branch_distribution_requests",
        "branch_distribution_items",
        "audit_logs",
        "idx_employees_deleted_at",
        "idx_attendance_work_date",
        "idx_leave_requests_employee_id",
        "idx_leave_requests_status",
        "idx_payrolls_employee_id",
        "idx_payrolls_status",
        "idx_payroll_deductions_payroll_id",
        "idx_scm_requests_status",
        "idx_branch_distribution_requests_status",
        "idx_audit_logs_entity",
        "idx_audit_logs_user_id",
    ];

    #[tokio::test]
    async fn migrations_create_workflow_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        assert!(applied_versions(&pool).await.expect("versions before run").is_empty());

        run_pending(&pool).await.expect("run migrations");

        for table in
            ["leave_requests", "payrolls", "scm_requests", "branch_distribution_requests", "audit_logs"]
        {
            let count = sqlx::query(
                "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("check table")
            .get::<i64, _>("count");
            assert_eq!(count, 1, "table {table} should exist");
        }

        assert_eq!(applied_versions(&pool).await.expect("versions"), known_versions());
    }

    #[tokio::test]
    async fn audit_logs_reject_updates_and_deletes() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        sqlx::query(
            "INSERT INTO audit_logs (id, entity_kind, entity_id, user_id, action, remarks, created_at)
             VALUES ('a-1', 'payroll', 'PAY-1', 'u-1', 'submit', NULL, '2026-01-01T00:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .expect("insert audit row");

        let update = sqlx::query("UPDATE audit_logs SET remarks = 'edited' WHERE id = 'a-1'")
            .execute(&pool)
            .await;
        assert!(update.is_err(), "audit rows must not be editable");

        let delete = sqlx::query("DELETE FROM audit_logs WHERE id = 'a-1'").execute(&pool).await;
        assert!(delete.is_err(), "audit rows must not be deletable");
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let initial_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            initial_signature.len(),
            MANAGED_SCHEMA_OBJECTS.len(),
            "initial migration pass should create all managed schema objects",
        );

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        let after_down_signature = managed_schema_signature(&pool).await;
        assert!(
            after_down_signature.is_empty(),
            "managed schema objects should be removed after full undo",
        );

        run_pending(&pool).await.expect("re-run migrations");

        let after_second_up_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            after_second_up_signature, initial_signature,
            "up/down/up should preserve migration-managed schema signature",
        );
    }

    async fn managed_schema_signature(pool: &sqlx::SqlitePool) -> Vec<(String, String, String)> {
        let mut signature: Vec<(String, String, String)> = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .filter_map(|row| {
            let name = row.get::<String, _>("name");
            if MANAGED_SCHEMA_OBJECTS.contains(&name.as_str()) {
                Some((row.get::<String, _>("type"), name, row.get::<String, _>("sql")))
            } else {
                None
            }
        })
        .collect();
        signature.sort();
        signature
    }
}
