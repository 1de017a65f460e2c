use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection};

use erpflow_core::domain::branch_distribution::{
    BranchDistributionId, BranchDistributionRequest, DistributionItem,
};
use erpflow_core::workflow::states::WorkflowState;

use super::rows::{lifecycle, parse_decimal, parse_optional_timestamp, parse_state, parse_timestamp};
use super::{BranchDistributionRepository, RecordFilter, RepositoryError};
use crate::DbPool;

const ENTITY: &str = "branch_distribution";

const SELECT_COLUMNS: &str = "SELECT id, branch_name, status, created_by, processed_by,
        fulfilled_by, requested_at, approved_at, rejected_at, fulfilled_at, canceled_at,
        rejection_reason, notes, version, updated_at, deleted_at
 FROM branch_distribution_requests";

pub struct SqlBranchDistributionRepository {
    pool: DbPool,
}

impl SqlBranchDistributionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, request_id: &str) -> Result<Vec<DistributionItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT product_name, unit, quantity
             FROM branch_distribution_items
             WHERE request_id = ?
             ORDER BY line_no ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(DistributionItem {
                    product_name: row.try_get("product_name")?,
                    unit: row.try_get("unit")?,
                    quantity: parse_decimal("quantity", row.try_get("quantity")?)?,
                })
            })
            .collect()
    }
}

async fn replace_items(
    conn: &mut SqliteConnection,
    request: &BranchDistributionRequest,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM branch_distribution_items WHERE request_id = ?")
        .bind(&request.id.0)
        .execute(&mut *conn)
        .await?;

    for (line_no, item) in request.items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO branch_distribution_items (request_id, line_no, product_name, unit, quantity)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(line_no as i64 + 1)
        .bind(&item.product_name)
        .bind(&item.unit)
        .bind(item.quantity.to_string())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl BranchDistributionRepository for SqlBranchDistributionRepository {
    async fn find_by_id(
        &self,
        id: &BranchDistributionId,
    ) -> Result<Option<BranchDistributionRequest>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut request = distribution_from_row(row)?;
        request.items = self.load_items(&request.id.0).await?;
        Ok(Some(request))
    }

    async fn list(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<BranchDistributionRequest>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        query.push(" WHERE deleted_at IS NULL");
        if let Some(status) = &filter.status {
            query.push(" AND status = ").push_bind(status.to_ascii_lowercase());
        }
        query.push(" ORDER BY requested_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            let mut request = distribution_from_row(row)?;
            request.items = self.load_items(&request.id.0).await?;
            requests.push(request);
        }
        Ok(requests)
    }

    async fn insert(&self, request: &BranchDistributionRequest) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO branch_distribution_requests (
                id, branch_name, status, created_by, processed_by, fulfilled_by,
                requested_at, approved_at, rejected_at, fulfilled_at, canceled_at,
                rejection_reason, notes, version, created_at, updated_at, deleted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.branch_name)
        .bind(request.status.as_str())
        .bind(&request.created_by)
        .bind(request.processed_by.as_deref())
        .bind(request.fulfilled_by.as_deref())
        .bind(request.requested_at.to_rfc3339())
        .bind(request.approved_at.map(|at| at.to_rfc3339()))
        .bind(request.rejected_at.map(|at| at.to_rfc3339()))
        .bind(request.fulfilled_at.map(|at| at.to_rfc3339()))
        .bind(request.canceled_at.map(|at| at.to_rfc3339()))
        .bind(request.rejection_reason.as_deref())
        .bind(request.notes.as_deref())
        .bind(request.version)
        .bind(request.requested_at.to_rfc3339())
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
        request: &BranchDistributionRequest,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE branch_distribution_requests SET
                branch_name = ?, notes = ?, updated_at = ?, version = version + 1
             WHERE id = ? AND version = ? AND deleted_at IS NULL",
        )
        .bind(&request.branch_name)
        .bind(request.notes.as_deref())
        .bind(request.updated_at.to_rfc3339())
        .bind(&request.id.0)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM branch_distribution_requests WHERE id = ? AND deleted_at IS NULL",
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

fn distribution_from_row(row: SqliteRow) -> Result<BranchDistributionRequest, RepositoryError> {
    Ok(BranchDistributionRequest {
        id: BranchDistributionId(row.try_get("id")?),
        branch_name: row.try_get("branch_name")?,
        status: parse_state("status", row.try_get("status")?)?,
        created_by: row.try_get("created_by")?,
        processed_by: row.try_get("processed_by")?,
        fulfilled_by: row.try_get("fulfilled_by")?,
        requested_at: parse_timestamp("requested_at", row.try_get("requested_at")?)?,
        approved_at: parse_optional_timestamp("approved_at", row.try_get("approved_at")?)?,
        rejected_at: parse_optional_timestamp("rejected_at", row.try_get("rejected_at")?)?,
        fulfilled_at: parse_optional_timestamp("fulfilled_at", row.try_get("fulfilled_at")?)?,
        canceled_at: parse_optional_timestamp("canceled_at", row.try_get("canceled_at")?)?,
        rejection_reason: row.try_get("rejection_reason")?,
        notes: row.try_get("notes")?,
        items: Vec::new(),
        version: row.try_get("version")?,
        lifecycle: lifecycle(&row)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use erpflow_core::domain::branch_distribution::{
        BranchDistributionDraft, BranchDistributionId, BranchDistributionRequest,
        BranchDistributionStatus, DistributionItem,
    };

    use super::SqlBranchDistributionRepository;
    use crate::repositories::test_support::setup;
    use crate::repositories::{BranchDistributionRepository, RecordFilter, RepositoryError};

    fn item(product_name: &str, quantity: i64) -> DistributionItem {
        DistributionItem {
            product_name: product_name.to_string(),
            unit: "tray".to_string(),
            quantity: Decimal::new(quantity, 0),
        }
    }

    #[tokio::test]
    async fn insert_and_list_with_case_insensitive_status_filter() {
        let pool = setup().await;
        let repo = SqlBranchDistributionRepository::new(pool);

        let request = BranchDistributionRequest::create(
            BranchDistributionId("BD-1".to_string()),
            BranchDistributionDraft {
                branch_name: "Quezon Ave".to_string(),
                created_by: "u-branch".to_string(),
                notes: Some("weekend surge".to_string()),
                items: vec![
                    DistributionItem {
                        product_name: "Pandesal".to_string(),
                        unit: "tray".to_string(),
                        quantity: Decimal::new(12, 0),
                    },
                    DistributionItem {
                        product_name: "Monay".to_string(),
                        unit: "tray".to_string(),
                        quantity: Decimal::new(4, 0),
                    },
                ],
            },
            Utc::now(),
        )
        .expect("create");
        repo.insert(&request).await.expect("insert");

        let stored = repo.find_by_id(&request.id).await.expect("find").expect("row");
        assert_eq!(stored.status, BranchDistributionStatus::Pending);
        assert_eq!(stored.items, request.items);
        assert_eq!(stored.total_quantity(), Decimal::new(16, 0));

        let pending = repo
            .list(&RecordFilter { status: Some("Pending".to_string()), employee_id: None })
            .await
            .expect("list");
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn update_rewrites_items_and_bumps_version() {
        let pool = setup().await;
        let repo = SqlBranchDistributionRepository::new(pool);

        let mut request = BranchDistributionRequest::create(
            BranchDistributionId("BD-2".to_string()),
            BranchDistributionDraft {
                branch_name: "Cubao".to_string(),
                created_by: "u-branch".to_string(),
                notes: None,
                items: vec![item("Pandesal", 10), item("Monay", 2)],
            },
            Utc::now(),
        )
        .expect("create");
        repo.insert(&request).await.expect("insert");
        assert_eq!(repo.find_by_id(&request.id).await.expect("find").as_ref(), Some(&request));

        request
            .revise(
                BranchDistributionDraft {
                    branch_name: "Cubao Annex".to_string(),
                    created_by: "u-branch".to_string(),
                    notes: Some("moved to annex".to_string()),
                    items: vec![item("Ensaymada", 6)],
                },
                Utc::now(),
            )
            .expect("revise");
        repo.update(&request, 1).await.expect("update");

        let stored = repo.find_by_id(&request.id).await.expect("find").expect("row");
        assert_eq!(stored.version, 2);
        assert_eq!(stored.branch_name, "Cubao Annex");
        assert_eq!(stored.notes.as_deref(), Some("moved to annex"));
        assert_eq!(stored.items, vec![item("Ensaymada", 6)]);

        let stale = repo.update(&request, 1).await.expect_err("stale version");
        assert!(matches!(stale, RepositoryError::VersionConflict { expected: 1, .. }));
    }
}
