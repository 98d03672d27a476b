// ==========================================
// 仓储库存系统 - 批次领域模型
// ==========================================
// 批次 = 某商品一次入库的数量 + 过期时间
// 红线: quantity >= 0；数量归零的批次保留（作为分配历史），不删除
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Batch - 库存批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    // ===== 主键 =====
    pub id: i64,                                   // 批次ID（入库时分配）
    pub product_id: i64,                           // 商品ID

    // ===== 可变字段 =====
    pub quantity: i64,                             // 剩余数量（仅分配引擎扣减）

    // ===== 不可变字段 =====
    pub expiration_date: DateTime<Utc>,            // 过期时间（排序键）
    pub manufacturing_date: Option<DateTime<Utc>>, // 生产时间（仅展示）
    pub import_date: DateTime<Utc>,                // 入库时间（仅展示）
}

impl Batch {
    /// 是否为候选批次（剩余数量 > 0）
    pub fn is_available(&self) -> bool {
        self.quantity > 0
    }

    /// 距过期的天数（向上取整，已过期为负数或 0）
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.expiration_date - now).num_seconds();
        let day = 24 * 3600;
        // 向上取整（对负数同样成立）
        if secs >= 0 {
            (secs + day - 1) / day
        } else {
            -((-secs) / day)
        }
    }
}

// ==========================================
// NewBatch - 待入库批次（尚未分配ID）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBatch {
    pub product_id: i64,
    pub quantity: i64,
    pub expiration_date: DateTime<Utc>,
    pub manufacturing_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn batch_expiring_at(expiration_date: DateTime<Utc>) -> Batch {
        Batch {
            id: 1,
            product_id: 10,
            quantity: 5,
            expiration_date,
            manufacturing_date: None,
            import_date: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_days_until_expiry_rounds_up() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let batch = batch_expiring_at(now + Duration::hours(25));
        assert_eq!(batch.days_until_expiry(now), 2);

        let batch = batch_expiring_at(now + Duration::hours(24));
        assert_eq!(batch.days_until_expiry(now), 1);
    }

    #[test]
    fn test_days_until_expiry_expired() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let batch = batch_expiring_at(now - Duration::hours(30));
        assert_eq!(batch.days_until_expiry(now), -1);

        let batch = batch_expiring_at(now - Duration::hours(3));
        assert_eq!(batch.days_until_expiry(now), 0);
    }

    #[test]
    fn test_is_available() {
        let mut batch = batch_expiring_at(Utc::now());
        assert!(batch.is_available());
        batch.quantity = 0;
        assert!(!batch.is_available());
    }
}
