// ==========================================
// 仓储库存系统 - 核心库
// ==========================================
// 职责: 效期优先 (FEFO) 出库分配：批次最小堆 + FIFO 请求队列
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分配规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    AllocationResult, Batch, Consumption, ExportReceipt, ExportRequest, FailureKind,
    ImportReceipt, LedgerEntry, NewBatch, RequestOutcome,
};

// 引擎
pub use engine::{
    AllocationEngine, AllocationError, ExpiryAlert, ExpiryMonitor, PriorityBatchSelector,
    QueueProcessor, RequestQueue,
};

// API
pub use api::{ApiError, ApiResult, InventoryApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "仓储库存系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
