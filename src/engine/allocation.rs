// ==========================================
// 仓储库存系统 - 效期优先分配引擎
// ==========================================
// 职责: 为单个出库请求按过期时间升序消耗批次
// 输入: 出库请求 + 商品候选批次（BatchReader 提供）
// 输出: AllocationResult（消耗明细 + 缺口）
// ==========================================
// 红线: 同一请求内逐批次顺序扣减，上一批次写入完成后才处理下一批次
// 说明: 部分满足记为成功；已执行的扣减不回滚
// ==========================================

use crate::domain::allocation::{AllocationResult, Consumption};
use crate::domain::batch::Batch;
use crate::domain::request::ExportRequest;
use crate::engine::batch_selector::PriorityBatchSelector;
use crate::engine::error::{AllocationError, AllocationOutcome};
use crate::engine::stock_io::{BatchReader, BatchWriter};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// AllocationEngine - 分配引擎
// ==========================================
pub struct AllocationEngine {
    reader: Arc<dyn BatchReader>,
    writer: Arc<dyn BatchWriter>,
}

impl AllocationEngine {
    /// 构造函数
    ///
    /// # 参数
    /// - `reader`: 候选批次读取
    /// - `writer`: 批次数量扣减
    pub fn new(reader: Arc<dyn BatchReader>, writer: Arc<dyn BatchWriter>) -> Self {
        Self { reader, writer }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行分配（带写入）
    ///
    /// 规则:
    /// 1) quantity <= 0 → InvalidQuantity
    /// 2) 无候选批次 → OutOfStock（不发起任何写入）
    /// 3) 每次取最早过期批次，take = min(batch.quantity, remaining)，扣减后再取下一批
    /// 4) remaining == 0 或批次耗尽时停止
    ///
    /// # 返回
    /// - Ok(AllocationResult): 分配结果（remaining_unfulfilled > 0 表示部分满足）
    /// - Err: 请求级错误；写入中途失败时返回 Interrupted，携带失败前已生效的扣减
    #[instrument(skip(self, request), fields(
        request_id = %request.request_id,
        product_id = request.product_id,
        quantity = request.quantity
    ))]
    pub async fn allocate(&self, request: &ExportRequest) -> AllocationOutcome<AllocationResult> {
        validate_quantity(request.quantity)?;

        let candidates = self.load_candidates(request.product_id).await?;
        if candidates.is_empty() {
            tracing::warn!("无可用批次: product_id={}", request.product_id);
            return Err(AllocationError::OutOfStock {
                product_id: request.product_id,
            });
        }

        let mut selector = PriorityBatchSelector::from_batches(candidates);
        let mut remaining = request.quantity;
        let mut consumed: Vec<Consumption> = Vec::new();

        while remaining > 0 {
            let Some(batch) = selector.extract_min() else {
                break;
            };
            let take = batch.quantity.min(remaining);

            match self.writer.decrement_quantity(batch.id, take).await {
                Ok(left) => {
                    tracing::debug!(
                        "批次扣减: batch_id={}, expiration={}, take={}, left={}",
                        batch.id,
                        batch.expiration_date,
                        take,
                        left
                    );
                }
                Err(e) => {
                    if !consumed.is_empty() {
                        tracing::warn!(
                            "扣减中途失败，已执行的扣减保持生效: request_id={}, applied={:?}",
                            request.request_id,
                            consumed
                        );
                    }
                    return Err(e.with_applied(consumed));
                }
            }

            consumed.push(Consumption {
                batch_id: batch.id,
                quantity: take,
            });
            remaining -= take;
        }

        if remaining > 0 {
            tracing::warn!(
                "部分满足: request_id={}, requested={}, shortfall={}",
                request.request_id,
                request.quantity,
                remaining
            );
        }

        Ok(AllocationResult {
            request_id: request.request_id.clone(),
            product_id: request.product_id,
            requested_quantity: request.quantity,
            consumed,
            remaining_unfulfilled: remaining,
        })
    }

    /// 预演分配（只读，不发起写入）
    ///
    /// 用于展示“如果现在出库会消耗哪些批次”
    pub async fn preview(&self, request: &ExportRequest) -> AllocationOutcome<AllocationResult> {
        validate_quantity(request.quantity)?;

        let candidates = self.load_candidates(request.product_id).await?;
        if candidates.is_empty() {
            return Err(AllocationError::OutOfStock {
                product_id: request.product_id,
            });
        }

        Ok(plan_allocation(request, candidates))
    }

    /// 读取并过滤候选批次
    async fn load_candidates(&self, product_id: i64) -> AllocationOutcome<Vec<Batch>> {
        let batches = self.reader.list_available_batches(product_id).await?;
        Ok(batches
            .into_iter()
            .filter(|b| b.product_id == product_id && b.is_available())
            .collect())
    }
}

/// 校验请求数量
pub fn validate_quantity(quantity: i64) -> AllocationOutcome<()> {
    if quantity <= 0 {
        return Err(AllocationError::InvalidQuantity { quantity });
    }
    Ok(())
}

/// 纯计算的分配方案（不写入）
///
/// 与 `AllocationEngine::allocate` 使用相同的效期顺序与取量规则
pub fn plan_allocation(request: &ExportRequest, candidates: Vec<Batch>) -> AllocationResult {
    let mut selector = PriorityBatchSelector::from_batches(
        candidates.into_iter().filter(|b| b.is_available()),
    );
    let mut remaining = request.quantity.max(0);
    let mut consumed = Vec::new();

    while remaining > 0 {
        let Some(batch) = selector.extract_min() else {
            break;
        };
        let take = batch.quantity.min(remaining);
        consumed.push(Consumption {
            batch_id: batch.id,
            quantity: take,
        });
        remaining -= take;
    }

    AllocationResult {
        request_id: request.request_id.clone(),
        product_id: request.product_id,
        requested_quantity: request.quantity,
        consumed,
        remaining_unfulfilled: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::FailureKind;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ==========================================
    // 测试辅助: 内存批次存储
    // ==========================================

    #[derive(Default)]
    struct FakeStore {
        batches: Mutex<HashMap<i64, Batch>>,
        writes: Mutex<Vec<(i64, i64)>>,
        fail_on_batch: Option<i64>,
    }

    impl FakeStore {
        fn with_batches(batches: Vec<Batch>) -> Self {
            Self {
                batches: Mutex::new(batches.into_iter().map(|b| (b.id, b)).collect()),
                ..Self::default()
            }
        }

        fn quantity_of(&self, batch_id: i64) -> i64 {
            self.batches.lock().unwrap()[&batch_id].quantity
        }

        fn writes(&self) -> Vec<(i64, i64)> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BatchReader for FakeStore {
        async fn list_available_batches(&self, product_id: i64) -> AllocationOutcome<Vec<Batch>> {
            Ok(self
                .batches
                .lock()
                .unwrap()
                .values()
                .filter(|b| b.product_id == product_id && b.quantity > 0)
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl BatchWriter for FakeStore {
        async fn decrement_quantity(&self, batch_id: i64, amount: i64) -> AllocationOutcome<i64> {
            if self.fail_on_batch == Some(batch_id) {
                return Err(AllocationError::BatchNotFound { batch_id });
            }
            let mut batches = self.batches.lock().unwrap();
            let batch = batches
                .get_mut(&batch_id)
                .ok_or(AllocationError::BatchNotFound { batch_id })?;
            if amount > batch.quantity {
                return Err(AllocationError::InsufficientQuantity {
                    batch_id,
                    requested: amount,
                    available: batch.quantity,
                });
            }
            batch.quantity -= amount;
            self.writes.lock().unwrap().push((batch_id, amount));
            Ok(batch.quantity)
        }
    }

    fn batch(id: i64, quantity: i64, day: u32) -> Batch {
        Batch {
            id,
            product_id: 1,
            quantity,
            expiration_date: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
            manufacturing_date: None,
            import_date: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
        }
    }

    fn engine_over(store: Arc<FakeStore>) -> AllocationEngine {
        AllocationEngine::new(store.clone(), store)
    }

    fn consumption(pairs: &[(i64, i64)]) -> Vec<Consumption> {
        pairs
            .iter()
            .map(|&(batch_id, quantity)| Consumption { batch_id, quantity })
            .collect()
    }

    // ==========================================
    // 测试用例
    // ==========================================

    #[tokio::test]
    async fn test_full_allocation_oldest_first() {
        let store = Arc::new(FakeStore::with_batches(vec![batch(1, 5, 10), batch(2, 3, 5)]));
        let engine = engine_over(store.clone());

        let result = engine.allocate(&ExportRequest::new(1, 6)).await.unwrap();

        assert_eq!(result.consumed, consumption(&[(2, 3), (1, 3)]));
        assert_eq!(result.remaining_unfulfilled, 0);
        assert_eq!(store.quantity_of(1), 2);
        assert_eq!(store.quantity_of(2), 0);
    }

    #[tokio::test]
    async fn test_shortfall_is_success_with_remaining() {
        let store = Arc::new(FakeStore::with_batches(vec![batch(1, 5, 10), batch(2, 3, 5)]));
        let engine = engine_over(store.clone());

        let result = engine.allocate(&ExportRequest::new(1, 10)).await.unwrap();

        assert_eq!(result.consumed, consumption(&[(2, 3), (1, 5)]));
        assert_eq!(result.remaining_unfulfilled, 2);
        assert!(result.is_partial());
        assert_eq!(store.quantity_of(1), 0);
        assert_eq!(store.quantity_of(2), 0);
    }

    #[tokio::test]
    async fn test_out_of_stock_issues_no_writes() {
        let store = Arc::new(FakeStore::with_batches(vec![batch(1, 0, 3)]));
        let engine = engine_over(store.clone());

        let err = engine.allocate(&ExportRequest::new(1, 1)).await.unwrap_err();

        assert!(matches!(err, AllocationError::OutOfStock { product_id: 1 }));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected() {
        let store = Arc::new(FakeStore::with_batches(vec![batch(1, 5, 3)]));
        let engine = engine_over(store.clone());

        for qty in [0, -4] {
            let err = engine.allocate(&ExportRequest::new(1, qty)).await.unwrap_err();
            assert!(matches!(err, AllocationError::InvalidQuantity { quantity } if quantity == qty));
        }
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_stops_once_satisfied() {
        let store = Arc::new(FakeStore::with_batches(vec![
            batch(1, 4, 2),
            batch(2, 4, 4),
            batch(3, 4, 6),
        ]));
        let engine = engine_over(store.clone());

        let result = engine.allocate(&ExportRequest::new(1, 4)).await.unwrap();

        assert_eq!(result.consumed, consumption(&[(1, 4)]));
        assert_eq!(store.writes(), vec![(1, 4)]);
        assert_eq!(store.quantity_of(2), 4);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_earlier_decrements() {
        let mut store = FakeStore::with_batches(vec![batch(1, 2, 1), batch(2, 5, 2)]);
        store.fail_on_batch = Some(2);
        let store = Arc::new(store);
        let engine = engine_over(store.clone());

        let err = engine.allocate(&ExportRequest::new(1, 4)).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::BatchNotFound);
        assert_eq!(err.applied(), consumption(&[(1, 2)]).as_slice());
        match &err {
            AllocationError::Interrupted { cause, .. } => {
                assert!(matches!(**cause, AllocationError::BatchNotFound { batch_id: 2 }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.quantity_of(1), 0);
        assert_eq!(store.quantity_of(2), 5);
    }

    #[tokio::test]
    async fn test_first_write_failure_has_nothing_applied() {
        let mut store = FakeStore::with_batches(vec![batch(1, 2, 1), batch(2, 5, 2)]);
        store.fail_on_batch = Some(1);
        let store = Arc::new(store);
        let engine = engine_over(store.clone());

        let err = engine.allocate(&ExportRequest::new(1, 4)).await.unwrap_err();

        assert!(matches!(err, AllocationError::BatchNotFound { batch_id: 1 }));
        assert!(err.applied().is_empty());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_preview_does_not_write() {
        let store = Arc::new(FakeStore::with_batches(vec![batch(1, 5, 10), batch(2, 3, 5)]));
        let engine = engine_over(store.clone());

        let result = engine.preview(&ExportRequest::new(1, 6)).await.unwrap();

        assert_eq!(result.consumed, consumption(&[(2, 3), (1, 3)]));
        assert!(store.writes().is_empty());
        assert_eq!(store.quantity_of(1), 5);
    }

    #[test]
    fn test_plan_allocation_skips_empty_batches() {
        let request = ExportRequest::new(1, 3);
        let result = plan_allocation(&request, vec![batch(1, 0, 1), batch(2, 2, 2), batch(3, 2, 3)]);
        assert_eq!(result.consumed, consumption(&[(2, 2), (3, 1)]));
        assert!(result.is_fully_satisfied());
    }
}
