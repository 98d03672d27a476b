// ==========================================
// 仓储库存系统 - 出库请求领域模型
// ==========================================
// 生命周期: 调用方创建 → 入队 → 排空时出队一次（无论成败均移出队列）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 出库请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// 请求ID（UUID v4）
    pub request_id: String,
    /// 商品ID
    pub product_id: i64,
    /// 请求数量（必须 > 0，否则为 InvalidQuantity）
    pub quantity: i64,
    /// 客户标识（不做校验）
    pub customer_id: Option<String>,
    /// 提交时间
    pub submitted_at: DateTime<Utc>,
}

impl ExportRequest {
    /// 创建新的出库请求
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            product_id,
            quantity,
            customer_id: None,
            submitted_at: Utc::now(),
        }
    }

    /// 附加客户标识
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}
