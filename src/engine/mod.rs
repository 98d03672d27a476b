// ==========================================
// 仓储库存系统 - 引擎层
// ==========================================
// 职责: 效期优先 (FEFO) 批次分配核心，不拼 SQL
// 组成: 批次最小堆 / FIFO 请求队列 / 分配引擎 / 排空处理器 / 临期视图
// ==========================================

pub mod allocation;
pub mod batch_selector;
pub mod error;
pub mod expiry;
pub mod queue_processor;
pub mod request_queue;
pub mod stock_io;

// 重导出核心引擎
pub use allocation::{plan_allocation, validate_quantity, AllocationEngine};
pub use batch_selector::PriorityBatchSelector;
pub use error::{AllocationError, AllocationOutcome};
pub use expiry::{ExpiryAlert, ExpiryMonitor};
pub use queue_processor::QueueProcessor;
pub use request_queue::RequestQueue;
pub use stock_io::{BatchReader, BatchWriter, OptionalReceiptRecorder, ReceiptRecorder};
