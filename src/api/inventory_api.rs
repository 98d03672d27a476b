// ==========================================
// 仓储库存系统 - 库存服务 API
// ==========================================
// 职责: 出库请求提交与排空、批次入库、临期视图、分配预演
// 红线: 同一实例同时最多只有一次排空在执行（排空期间持有队列锁）
// 说明: 显式构造，调用方持有实例；不使用全局单例
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, InventoryConfig};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::allocation::{AllocationResult, LedgerEntry};
use crate::domain::batch::{Batch, NewBatch};
use crate::domain::receipt::ExportReceipt;
use crate::domain::request::ExportRequest;
use crate::engine::{
    validate_quantity, AllocationEngine, ExpiryAlert, ExpiryMonitor, QueueProcessor, RequestQueue,
};
use crate::importer::{
    map_request_row, BatchImporter, CsvParser, FileParser, ImportRowError, ImportSummary,
};
use crate::repository::{BatchRepository, ReceiptRepository};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::instrument;

// ==========================================
// InventoryApi - 库存服务
// ==========================================
pub struct InventoryApi {
    batch_repo: Arc<BatchRepository>,
    receipt_repo: Arc<ReceiptRepository>,
    engine: Arc<AllocationEngine>,
    processor: QueueProcessor,
    queue: AsyncMutex<RequestQueue>,
    monitor: ExpiryMonitor,
    importer: BatchImporter,
    config: InventoryConfig,
}

impl InventoryApi {
    /// 打开数据库并构造服务（建表幂等）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        tracing::info!("库存服务已打开: db_path={}", db_path);
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从共享连接构造服务（连接须已建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())?.load()?;

        let batch_repo = Arc::new(BatchRepository::from_connection(conn.clone()));
        let receipt_repo = Arc::new(ReceiptRepository::from_connection(conn));

        let engine = Arc::new(AllocationEngine::new(batch_repo.clone(), batch_repo.clone()));
        let processor = QueueProcessor::with_recorder(engine.clone(), receipt_repo.clone());
        let importer = BatchImporter::new(batch_repo.clone(), receipt_repo.clone());

        tracing::debug!(
            "库存服务配置: expiring_top_k={}, urgent_days={}, history_limit={}",
            config.expiring_top_k,
            config.urgent_days,
            config.history_limit
        );

        Ok(Self {
            batch_repo,
            receipt_repo,
            engine,
            processor,
            queue: AsyncMutex::new(RequestQueue::with_history_limit(config.history_limit)),
            monitor: ExpiryMonitor::new(config.urgent_days),
            importer,
            config,
        })
    }

    /// 当前配置快照
    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    // ==========================================
    // 出库
    // ==========================================

    /// 提交出库请求
    ///
    /// # 返回
    /// - Ok(usize): 入队后的队列长度（即该请求的排队位置，从 1 开始）
    /// - Err(InvalidQuantity): quantity <= 0，请求不入队
    pub async fn submit(&self, request: ExportRequest) -> ApiResult<usize> {
        validate_quantity(request.quantity)?;

        let mut queue = self.queue.lock().await;
        let position = queue.enqueue(request);
        tracing::debug!("出库请求入队: position={}", position);
        Ok(position)
    }

    /// 从 CSV 批量提交出库请求
    ///
    /// 列: product_id, quantity, customer_id?
    ///
    /// # 返回
    /// - Ok((accepted, rejected)): 入队条数与被拒绝的行
    #[instrument(skip(self, file_path), fields(file = %file_path.display()))]
    pub async fn submit_csv(&self, file_path: &Path) -> ApiResult<(usize, Vec<ImportRowError>)> {
        let records = CsvParser.parse_to_raw_records(file_path)?;

        let mut accepted = 0;
        let mut rejected = Vec::new();
        for (row, record) in records {
            let outcome = match map_request_row(row, &record) {
                Ok(request) => self.submit(request).await,
                Err(e) => Err(e.into()),
            };
            match outcome {
                Ok(_) => accepted += 1,
                Err(e) => {
                    tracing::warn!("出库请求行被拒绝: row={}, error={}", row, e);
                    rejected.push(ImportRowError {
                        row,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "出库请求导入完成: accepted={}, rejected={}",
            accepted,
            rejected.len()
        );
        Ok((accepted, rejected))
    }

    /// 排空队列
    ///
    /// 排空期间持有队列锁：并发的 submit 会等待本次排空结束，
    /// 排空开始后提交的请求不会进入本次台账
    pub async fn drain(&self) -> Vec<LedgerEntry> {
        let mut queue = self.queue.lock().await;
        self.processor.drain(&mut queue).await
    }

    /// 待处理请求数
    pub async fn pending_count(&self) -> usize {
        self.queue.lock().await.size()
    }

    /// 最近提交的请求（新 → 旧），最多 limit 条
    pub async fn history(&self, limit: usize) -> Vec<ExportRequest> {
        self.queue
            .lock()
            .await
            .history()
            .take(limit)
            .cloned()
            .collect()
    }

    /// 预演分配（不扣减库存）
    pub async fn preview(&self, request: &ExportRequest) -> ApiResult<AllocationResult> {
        Ok(self.engine.preview(request).await?)
    }

    /// 查询出库单
    pub fn export_receipt(&self, receipt_id: i64) -> ApiResult<ExportReceipt> {
        self.receipt_repo
            .find_export_receipt(receipt_id)?
            .ok_or_else(|| ApiError::NotFound(format!("出库单(id={})不存在", receipt_id)))
    }

    // ==========================================
    // 入库
    // ==========================================

    /// 单批次入库
    pub fn import_batch(&self, new_batch: NewBatch, supplier: Option<&str>) -> ApiResult<Batch> {
        if new_batch.quantity <= 0 {
            return Err(ApiError::InvalidQuantity {
                quantity: new_batch.quantity,
            });
        }
        Ok(self.importer.import_one(new_batch, supplier)?)
    }

    /// CSV 批量入库
    pub fn import_csv(&self, file_path: &Path) -> ApiResult<ImportSummary> {
        Ok(self.importer.import_csv(file_path)?)
    }

    /// 按ID查询批次
    pub fn get_batch(&self, batch_id: i64) -> ApiResult<Batch> {
        self.batch_repo
            .find_by_id(batch_id)?
            .ok_or_else(|| ApiError::NotFound(format!("批次(id={})不存在", batch_id)))
    }

    // ==========================================
    // 临期视图
    // ==========================================

    /// 最早过期的 k 个批次（跨商品，仅 quantity > 0）
    pub fn expiring_batches(&self, k: usize) -> ApiResult<Vec<Batch>> {
        let batches = self.batch_repo.list_all_available()?;
        Ok(self.monitor.top_expiring(batches, k))
    }

    /// 全部在库批次（按过期时间升序）
    pub fn stock_by_expiry(&self) -> ApiResult<Vec<Batch>> {
        let batches = self.batch_repo.list_all_available()?;
        Ok(self.monitor.sorted(batches))
    }

    /// 临期预警（数量取配置 expiring_top_k）
    pub fn expiry_alerts(&self, now: DateTime<Utc>) -> ApiResult<Vec<ExpiryAlert>> {
        let batches = self.batch_repo.list_all_available()?;
        Ok(self.monitor.alerts(batches, now, self.config.expiring_top_k))
    }
}
