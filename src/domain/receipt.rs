// ==========================================
// 仓储库存系统 - 出入库单据
// ==========================================

use crate::domain::allocation::Consumption;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 入库单（一张单据对应一个批次）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReceipt {
    pub id: i64,
    pub supplier: Option<String>,
    pub batch_id: i64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// 出库单（明细按消耗顺序排列）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportReceipt {
    pub id: i64,
    pub request_id: String,
    pub customer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub details: Vec<Consumption>,
}

impl ExportReceipt {
    /// 单据出库总量
    pub fn total_quantity(&self) -> i64 {
        self.details.iter().map(|d| d.quantity).sum()
    }
}
