// ==========================================
// 仓储库存系统 - 临期库存视图
// ==========================================
// 职责: 只读投影，按过期时间给出临期批次与预警
// 红线: 不写入、不参与分配决策
// ==========================================

use crate::domain::batch::Batch;
use crate::engine::batch_selector::PriorityBatchSelector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 默认紧急阈值（天）
pub const DEFAULT_URGENT_DAYS: i64 = 2;

/// 临期预警
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryAlert {
    pub batch: Batch,
    /// 距过期天数（向上取整）
    pub days_left: i64,
    /// 是否紧急（days_left <= urgent_days）
    pub urgent: bool,
}

// ==========================================
// ExpiryMonitor - 临期监控
// ==========================================
#[derive(Debug, Clone)]
pub struct ExpiryMonitor {
    urgent_days: i64,
}

impl ExpiryMonitor {
    pub fn new(urgent_days: i64) -> Self {
        Self { urgent_days }
    }

    /// 全部候选批次按过期时间升序排列
    pub fn sorted(&self, batches: Vec<Batch>) -> Vec<Batch> {
        PriorityBatchSelector::from_batches(batches.into_iter().filter(|b| b.is_available()))
            .into_sorted_vec()
    }

    /// 最早过期的 k 个批次
    pub fn top_expiring(&self, batches: Vec<Batch>, k: usize) -> Vec<Batch> {
        PriorityBatchSelector::from_batches(batches.into_iter().filter(|b| b.is_available()))
            .top_k(k)
    }

    /// 最早过期的 k 个批次的预警信息
    pub fn alerts(&self, batches: Vec<Batch>, now: DateTime<Utc>, k: usize) -> Vec<ExpiryAlert> {
        self.top_expiring(batches, k)
            .into_iter()
            .map(|batch| {
                let days_left = batch.days_until_expiry(now);
                ExpiryAlert {
                    batch,
                    days_left,
                    urgent: days_left <= self.urgent_days,
                }
            })
            .collect()
    }
}

impl Default for ExpiryMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_URGENT_DAYS)
    }
}
