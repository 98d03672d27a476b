// ==========================================
// 仓储库存系统 - API 层
// ==========================================
// 职责: 面向调用方的服务对象（提交 / 排空 / 入库 / 临期视图）
// 说明: 显式构造并注入，不使用全局单例
// ==========================================

pub mod error;
pub mod inventory_api;

pub use error::{ApiError, ApiResult};
pub use inventory_api::InventoryApi;
