// ==========================================
// 仓储库存系统 - 出入库单据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: import_receipt / export_receipt / export_receipt_detail 表读写
// ==========================================

use crate::domain::allocation::Consumption;
use crate::domain::receipt::{ExportReceipt, ImportReceipt};
use crate::domain::request::ExportRequest;
use crate::engine::error::AllocationOutcome;
use crate::engine::stock_io::ReceiptRecorder;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ReceiptRepository - 单据仓储
// ==========================================
pub struct ReceiptRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReceiptRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 入库单
    // ==========================================

    /// 写入入库单
    pub fn insert_import_receipt(
        &self,
        supplier: Option<&str>,
        batch_id: i64,
        quantity: i64,
        created_at: DateTime<Utc>,
    ) -> RepositoryResult<ImportReceipt> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_receipt (supplier, batch_id, quantity, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![supplier, batch_id, quantity, created_at],
        )?;

        Ok(ImportReceipt {
            id: conn.last_insert_rowid(),
            supplier: supplier.map(str::to_string),
            batch_id,
            quantity,
            created_at,
        })
    }

    /// 按批次查询入库单
    pub fn find_import_receipt_by_batch(&self, batch_id: i64) -> RepositoryResult<Option<ImportReceipt>> {
        let conn = self.get_conn()?;
        let receipt = conn
            .query_row(
                r#"
                SELECT id, supplier, batch_id, quantity, created_at
                FROM import_receipt
                WHERE batch_id = ?1
                "#,
                params![batch_id],
                |row| {
                    Ok(ImportReceipt {
                        id: row.get(0)?,
                        supplier: row.get(1)?,
                        batch_id: row.get(2)?,
                        quantity: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(receipt)
    }

    // ==========================================
    // 出库单
    // ==========================================

    /// 写入出库单（主表 + 明细，单事务）
    ///
    /// 明细顺序与消耗顺序一致（seq_no 从 1 开始）
    pub fn insert_export_receipt(
        &self,
        request: &ExportRequest,
        details: &[Consumption],
        created_at: DateTime<Utc>,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            r#"
            INSERT INTO export_receipt (request_id, customer, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![request.request_id, request.customer_id, created_at],
        )?;
        let receipt_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO export_receipt_detail (receipt_id, seq_no, batch_id, quantity)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;
            for (idx, detail) in details.iter().enumerate() {
                stmt.execute(params![receipt_id, idx as i64 + 1, detail.batch_id, detail.quantity])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(receipt_id)
    }

    /// 按ID查询出库单（含明细）
    pub fn find_export_receipt(&self, receipt_id: i64) -> RepositoryResult<Option<ExportReceipt>> {
        let conn = self.get_conn()?;

        let header = conn
            .query_row(
                "SELECT id, request_id, customer, created_at FROM export_receipt WHERE id = ?1",
                params![receipt_id],
                |row| {
                    Ok(ExportReceipt {
                        id: row.get(0)?,
                        request_id: row.get(1)?,
                        customer: row.get(2)?,
                        created_at: row.get(3)?,
                        details: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut receipt) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, quantity
            FROM export_receipt_detail
            WHERE receipt_id = ?1
            ORDER BY seq_no
            "#,
        )?;
        receipt.details = stmt
            .query_map(params![receipt_id], |row| {
                Ok(Consumption {
                    batch_id: row.get(0)?,
                    quantity: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<Consumption>>>()?;

        Ok(Some(receipt))
    }
}

#[async_trait]
impl ReceiptRecorder for ReceiptRepository {
    async fn record_export(
        &self,
        request: &ExportRequest,
        details: &[Consumption],
    ) -> AllocationOutcome<i64> {
        Ok(self.insert_export_receipt(request, details, Utc::now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::domain::allocation::AllocationResult;
    use crate::domain::batch::NewBatch;
    use crate::repository::batch_repo::BatchRepository;
    use chrono::TimeZone;

    fn shared_conn() -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(open_in_memory().unwrap()))
    }

    fn seed_batch(conn: &Arc<Mutex<Connection>>, quantity: i64) -> i64 {
        BatchRepository::from_connection(conn.clone())
            .insert(
                &NewBatch {
                    product_id: 1,
                    quantity,
                    expiration_date: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
                    manufacturing_date: None,
                },
                Utc::now(),
            )
            .unwrap()
            .id
    }

    #[test]
    fn test_import_receipt_round_trip() {
        let conn = shared_conn();
        let batch_id = seed_batch(&conn, 12);
        let repo = ReceiptRepository::from_connection(conn);

        let receipt = repo
            .insert_import_receipt(Some("ACME"), batch_id, 12, Utc::now())
            .unwrap();
        let found = repo.find_import_receipt_by_batch(batch_id).unwrap().unwrap();
        assert_eq!(found.id, receipt.id);
        assert_eq!(found.supplier.as_deref(), Some("ACME"));
        assert_eq!(found.quantity, 12);
    }

    #[tokio::test]
    async fn test_record_export_keeps_detail_order() {
        let conn = shared_conn();
        let first = seed_batch(&conn, 3);
        let second = seed_batch(&conn, 5);
        let repo = ReceiptRepository::from_connection(conn);

        let request = ExportRequest::new(1, 10).with_customer("C-9");
        let result = AllocationResult {
            request_id: request.request_id.clone(),
            product_id: 1,
            requested_quantity: 10,
            consumed: vec![
                Consumption { batch_id: second, quantity: 5 },
                Consumption { batch_id: first, quantity: 3 },
            ],
            remaining_unfulfilled: 2,
        };

        let receipt_id = repo.record_export(&request, &result.consumed).await.unwrap();
        let receipt = repo.find_export_receipt(receipt_id).unwrap().unwrap();

        assert_eq!(receipt.request_id, request.request_id);
        assert_eq!(receipt.customer.as_deref(), Some("C-9"));
        assert_eq!(receipt.details, result.consumed);
        assert_eq!(receipt.total_quantity(), 8);
    }

    #[test]
    fn test_missing_export_receipt() {
        let repo = ReceiptRepository::from_connection(shared_conn());
        assert!(repo.find_export_receipt(77).unwrap().is_none());
    }
}
