// ==========================================
// 仓储库存系统 - 出库队列排空处理器
// ==========================================
// 职责: 逐个出队并调用分配引擎，生成按出队顺序排列的台账
// 红线: 单个请求失败不影响后续请求；失败请求不重新入队
// 说明: 中途失败请求已生效的扣减同样记入台账并出单
// ==========================================

use crate::domain::allocation::{Consumption, LedgerEntry};
use crate::domain::request::ExportRequest;
use crate::engine::allocation::AllocationEngine;
use crate::engine::error::AllocationError;
use crate::engine::request_queue::RequestQueue;
use crate::engine::stock_io::{OptionalReceiptRecorder, ReceiptRecorder};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// QueueProcessor - 排空处理器
// ==========================================
pub struct QueueProcessor {
    engine: Arc<AllocationEngine>,
    recorder: OptionalReceiptRecorder,
}

impl QueueProcessor {
    /// 构造函数（不记录出库单）
    pub fn new(engine: Arc<AllocationEngine>) -> Self {
        Self {
            engine,
            recorder: OptionalReceiptRecorder::none(),
        }
    }

    /// 构造函数（成功分配后记录出库单）
    pub fn with_recorder(engine: Arc<AllocationEngine>, recorder: Arc<dyn ReceiptRecorder>) -> Self {
        Self {
            engine,
            recorder: OptionalReceiptRecorder::with_recorder(recorder),
        }
    }

    /// 排空队列
    ///
    /// 逐个出队处理，直至队列为空
    ///
    /// # 返回
    /// 台账（顺序与出队顺序一致）
    #[instrument(skip_all, fields(pending = queue.size()))]
    pub async fn drain(&self, queue: &mut RequestQueue) -> Vec<LedgerEntry> {
        let mut ledger = Vec::with_capacity(queue.size());

        while let Some(request) = queue.dequeue() {
            let entry = self.process_one(request).await;
            ledger.push(entry);
        }

        let succeeded = ledger.iter().filter(|e| e.is_success()).count();
        tracing::info!(
            "出库队列排空完成: total={}, success={}, failed={}",
            ledger.len(),
            succeeded,
            ledger.len() - succeeded
        );

        ledger
    }

    /// 处理单个请求（错误在此转为台账条目）
    async fn process_one(&self, request: ExportRequest) -> LedgerEntry {
        match self.engine.allocate(&request).await {
            Ok(result) => {
                let receipt_id = self.record_receipt(&request, &result.consumed).await;
                LedgerEntry::success(request, result, receipt_id)
            }
            Err(e) => {
                tracing::warn!(
                    "出库请求失败: request_id={}, product_id={}, kind={}, error={}",
                    request.request_id,
                    request.product_id,
                    e.kind(),
                    e
                );
                let kind = e.kind();
                let message = e.to_string();
                match e {
                    AllocationError::Interrupted { applied, .. } => {
                        let receipt_id = self.record_receipt(&request, &applied).await;
                        LedgerEntry::interrupted(request, kind, message, applied, receipt_id)
                    }
                    _ => LedgerEntry::failed(request, kind, message),
                }
            }
        }
    }

    /// 为已生效的扣减记录出库单
    ///
    /// 库存已扣减；单据记录失败只记日志，不改变台账状态
    async fn record_receipt(&self, request: &ExportRequest, details: &[Consumption]) -> Option<i64> {
        if details.is_empty() {
            return None;
        }
        match self.recorder.record(request, details).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    "出库单记录失败: request_id={}, error={}",
                    request.request_id,
                    e
                );
                None
            }
        }
    }
}
