// ==========================================
// 仓储库存系统 - 批次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 数量扣减为单行条件更新（quantity >= amount），按单批次原子执行
// ==========================================

use crate::domain::batch::{Batch, NewBatch};
use crate::engine::error::{AllocationError, AllocationOutcome};
use crate::engine::stock_io::{BatchReader, BatchWriter};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

/// 数量扣减结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// 已扣减
    Applied { remaining: i64 },
    /// 批次不存在
    NotFound,
    /// 存量不足（未扣减）
    Insufficient { available: i64 },
}

const BATCH_COLUMNS: &str =
    "id, product_id, quantity, expiration_date, manufacturing_date, created_at";

// ==========================================
// BatchRepository - 批次仓储
// ==========================================

/// 批次仓储
/// 职责: 管理 batch 表的读写
pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<Batch> {
        Ok(Batch {
            id: row.get(0)?,
            product_id: row.get(1)?,
            quantity: row.get(2)?,
            expiration_date: row.get(3)?,
            manufacturing_date: row.get(4)?,
            import_date: row.get(5)?,
        })
    }

    /// 插入新批次
    ///
    /// # 参数
    /// - new_batch: 待入库批次（quantity 必须 > 0）
    /// - import_date: 入库时间
    ///
    /// # 返回
    /// - Ok(Batch): 已分配ID的批次
    pub fn insert(&self, new_batch: &NewBatch, import_date: DateTime<Utc>) -> RepositoryResult<Batch> {
        if new_batch.quantity <= 0 {
            return Err(RepositoryError::FieldValueError {
                field: "quantity".to_string(),
                message: format!("入库数量必须大于 0，实际 {}", new_batch.quantity),
            });
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO batch (product_id, quantity, expiration_date, manufacturing_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                new_batch.product_id,
                new_batch.quantity,
                new_batch.expiration_date,
                new_batch.manufacturing_date,
                import_date,
            ],
        )?;

        Ok(Batch {
            id: conn.last_insert_rowid(),
            product_id: new_batch.product_id,
            quantity: new_batch.quantity,
            expiration_date: new_batch.expiration_date,
            manufacturing_date: new_batch.manufacturing_date,
            import_date,
        })
    }

    /// 按ID查询批次（含数量为 0 的批次）
    pub fn find_by_id(&self, batch_id: i64) -> RepositoryResult<Option<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM batch WHERE id = ?1", BATCH_COLUMNS);
        let batch = conn
            .query_row(&sql, params![batch_id], Self::map_row)
            .optional()?;
        Ok(batch)
    }

    /// 查询商品的候选批次（quantity > 0）
    pub fn list_available(&self, product_id: i64) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM batch WHERE product_id = ?1 AND quantity > 0 ORDER BY id",
            BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(params![product_id], Self::map_row)?
            .collect::<SqliteResult<Vec<Batch>>>()?;
        Ok(batches)
    }

    /// 查询全部候选批次（跨商品，用于临期视图）
    pub fn list_all_available(&self) -> RepositoryResult<Vec<Batch>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM batch WHERE quantity > 0 ORDER BY id", BATCH_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<Batch>>>()?;
        Ok(batches)
    }

    /// 扣减批次数量
    ///
    /// 条件更新保证不会扣成负数；未命中时再查询原因
    pub fn try_decrement(&self, batch_id: i64, amount: i64) -> RepositoryResult<DecrementOutcome> {
        if amount <= 0 {
            return Err(RepositoryError::ValidationError(format!(
                "扣减数量必须大于 0，实际 {}",
                amount
            )));
        }

        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE batch SET quantity = quantity - ?2 WHERE id = ?1 AND quantity >= ?2",
            params![batch_id, amount],
        )?;

        let current: Option<i64> = conn
            .query_row(
                "SELECT quantity FROM batch WHERE id = ?1",
                params![batch_id],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match (changed, current) {
            (_, None) => DecrementOutcome::NotFound,
            (0, Some(available)) => DecrementOutcome::Insufficient { available },
            (_, Some(remaining)) => DecrementOutcome::Applied { remaining },
        };
        Ok(outcome)
    }
}

// ==========================================
// 引擎协作接口实现
// ==========================================

#[async_trait]
impl BatchReader for BatchRepository {
    async fn list_available_batches(&self, product_id: i64) -> AllocationOutcome<Vec<Batch>> {
        Ok(self.list_available(product_id)?)
    }
}

#[async_trait]
impl BatchWriter for BatchRepository {
    async fn decrement_quantity(&self, batch_id: i64, amount: i64) -> AllocationOutcome<i64> {
        match self.try_decrement(batch_id, amount)? {
            DecrementOutcome::Applied { remaining } => Ok(remaining),
            DecrementOutcome::NotFound => Err(AllocationError::BatchNotFound { batch_id }),
            DecrementOutcome::Insufficient { available } => {
                Err(AllocationError::InsufficientQuantity {
                    batch_id,
                    requested: amount,
                    available,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use chrono::TimeZone;

    fn repo() -> BatchRepository {
        BatchRepository::from_connection(Arc::new(Mutex::new(open_in_memory().unwrap())))
    }

    fn new_batch(product_id: i64, quantity: i64, day: u32) -> NewBatch {
        NewBatch {
            product_id,
            quantity,
            expiration_date: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
            manufacturing_date: None,
        }
    }

    #[test]
    fn test_insert_and_find_round_trip_dates() {
        let repo = repo();
        let import_date = Utc.with_ymd_and_hms(2024, 12, 20, 8, 30, 0).unwrap();
        let inserted = repo.insert(&new_batch(1, 5, 10), import_date).unwrap();

        let found = repo.find_by_id(inserted.id).unwrap().unwrap();
        assert_eq!(found, inserted);
        assert_eq!(found.import_date, import_date);
    }

    #[test]
    fn test_insert_rejects_non_positive_quantity() {
        let repo = repo();
        let err = repo.insert(&new_batch(1, 0, 10), Utc::now()).unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }

    #[test]
    fn test_list_available_excludes_depleted_and_other_products() {
        let repo = repo();
        let a = repo.insert(&new_batch(1, 5, 10), Utc::now()).unwrap();
        let b = repo.insert(&new_batch(1, 2, 5), Utc::now()).unwrap();
        repo.insert(&new_batch(2, 9, 1), Utc::now()).unwrap();
        repo.try_decrement(b.id, 2).unwrap();

        let available = repo.list_available(1).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, a.id);

        // 已耗尽批次保留
        assert_eq!(repo.find_by_id(b.id).unwrap().map(|x| x.quantity), Some(0));
        assert_eq!(repo.list_all_available().unwrap().len(), 2);
    }

    #[test]
    fn test_try_decrement_outcomes() {
        let repo = repo();
        let batch = repo.insert(&new_batch(1, 5, 10), Utc::now()).unwrap();

        assert_eq!(
            repo.try_decrement(batch.id, 3).unwrap(),
            DecrementOutcome::Applied { remaining: 2 }
        );
        assert_eq!(
            repo.try_decrement(batch.id, 3).unwrap(),
            DecrementOutcome::Insufficient { available: 2 }
        );
        assert_eq!(repo.try_decrement(9999, 1).unwrap(), DecrementOutcome::NotFound);
        assert!(repo.try_decrement(batch.id, 0).is_err());
    }

    #[tokio::test]
    async fn test_writer_maps_errors() {
        let repo = repo();
        let batch = repo.insert(&new_batch(1, 1, 10), Utc::now()).unwrap();

        let err = repo.decrement_quantity(batch.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            AllocationError::InsufficientQuantity { requested: 2, available: 1, .. }
        ));

        let err = repo.decrement_quantity(424242, 1).await.unwrap_err();
        assert!(matches!(err, AllocationError::BatchNotFound { batch_id: 424242 }));
    }
}
