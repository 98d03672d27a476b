// ==========================================
// 仓储库存系统 - 领域模型层
// ==========================================
// 职责: 定义批次、出库请求、分配结果、单据等领域实体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod batch;
pub mod receipt;
pub mod request;

// 重导出核心类型
pub use allocation::{AllocationResult, Consumption, FailureKind, LedgerEntry, RequestOutcome};
pub use batch::{Batch, NewBatch};
pub use receipt::{ExportReceipt, ImportReceipt};
pub use request::ExportRequest;
