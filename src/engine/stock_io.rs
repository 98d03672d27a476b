// ==========================================
// 仓储库存系统 - 引擎层外部协作接口
// ==========================================
// 职责: 定义分配引擎依赖的读/写/单据接口，实现依赖倒置
// 说明: Engine 层定义 trait，Repository 层提供 SQLite 实现
// 约束: 写入按单批次原子执行，不保证跨批次事务
// ==========================================

use crate::domain::allocation::Consumption;
use crate::domain::batch::Batch;
use crate::domain::request::ExportRequest;
use crate::engine::error::AllocationOutcome;
use async_trait::async_trait;
use std::sync::Arc;

// ==========================================
// 批次读写 Trait
// ==========================================

/// 批次读取接口
#[async_trait]
pub trait BatchReader: Send + Sync {
    /// 读取商品的全部候选批次（quantity > 0）
    ///
    /// 返回调用时刻的持久化状态；读取后的数据陈旧风险由调用方承担
    async fn list_available_batches(&self, product_id: i64) -> AllocationOutcome<Vec<Batch>>;
}

/// 批次写入接口
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// 扣减批次数量（单批次原子读-改-写）
    ///
    /// # 返回
    /// - `Ok(remaining)`: 扣减后的剩余数量
    /// - `Err(BatchNotFound)`: 批次不存在
    /// - `Err(InsufficientQuantity)`: amount 超过当前存量
    async fn decrement_quantity(&self, batch_id: i64, amount: i64) -> AllocationOutcome<i64>;
}

// ==========================================
// 出库单记录 Trait
// ==========================================

/// 出库单记录接口
///
/// 由对端实现；分配引擎本身不生成、不存储单据
#[async_trait]
pub trait ReceiptRecorder: Send + Sync {
    /// 记录出库单
    ///
    /// details 为已生效的扣减明细（按消耗顺序），包括中途失败请求已扣减的部分
    ///
    /// # 返回
    /// - `Ok(receipt_id)`: 出库单ID
    /// - `Err(Storage)`: 单据持久化失败
    async fn record_export(
        &self,
        request: &ExportRequest,
        details: &[Consumption],
    ) -> AllocationOutcome<i64>;
}

/// 可选的出库单记录器包装
///
/// 简化 Option<Arc<dyn ReceiptRecorder>> 的使用
#[derive(Clone, Default)]
pub struct OptionalReceiptRecorder {
    inner: Option<Arc<dyn ReceiptRecorder>>,
}

impl OptionalReceiptRecorder {
    /// 创建带记录器的实例
    pub fn with_recorder(recorder: Arc<dyn ReceiptRecorder>) -> Self {
        Self {
            inner: Some(recorder),
        }
    }

    /// 创建空实例（不记录单据）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 记录出库单（如果配置了记录器）
    ///
    /// # 返回
    /// - `Ok(Some(id))`: 已记录
    /// - `Ok(None)`: 未配置记录器，跳过
    pub async fn record(
        &self,
        request: &ExportRequest,
        details: &[Consumption],
    ) -> AllocationOutcome<Option<i64>> {
        match &self.inner {
            Some(recorder) => recorder.record_export(request, details).await.map(Some),
            None => {
                tracing::debug!(
                    "OptionalReceiptRecorder: 未配置记录器，跳过出库单 - request_id={}",
                    request.request_id
                );
                Ok(None)
            }
        }
    }

    /// 检查是否配置了记录器
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}
