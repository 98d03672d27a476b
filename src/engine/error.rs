// ==========================================
// 仓储库存系统 - 分配引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 所有错误都是请求级别的，由 QueueProcessor 转为台账条目，不终止排空
// ==========================================

use crate::domain::allocation::{Consumption, FailureKind};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 分配引擎错误类型
#[derive(Error, Debug)]
pub enum AllocationError {
    // ===== 请求校验 =====
    #[error("无效的出库数量: {quantity}（必须大于 0）")]
    InvalidQuantity { quantity: i64 },

    // ===== 库存 =====
    #[error("商品无可用库存: product_id={product_id}")]
    OutOfStock { product_id: i64 },

    // ===== 写入协作方 =====
    #[error("批次不存在: batch_id={batch_id}")]
    BatchNotFound { batch_id: i64 },

    #[error("批次数量不足: batch_id={batch_id}, requested={requested}, available={available}")]
    InsufficientQuantity {
        batch_id: i64,
        requested: i64,
        available: i64,
    },

    // ===== 存储访问 =====
    #[error("存储访问失败: {0}")]
    Storage(#[from] RepositoryError),

    // ===== 中途失败 =====
    /// 写入协作方在部分批次扣减完成后失败；applied 中的扣减不回滚
    #[error("分配中途失败（已扣减 {} 个批次）: {cause}", .applied.len())]
    Interrupted {
        applied: Vec<Consumption>,
        #[source]
        cause: Box<AllocationError>,
    },
}

impl AllocationError {
    /// 映射为台账失败类型
    pub fn kind(&self) -> FailureKind {
        match self {
            AllocationError::InvalidQuantity { .. } => FailureKind::InvalidQuantity,
            AllocationError::OutOfStock { .. } => FailureKind::OutOfStock,
            AllocationError::BatchNotFound { .. } => FailureKind::BatchNotFound,
            AllocationError::InsufficientQuantity { .. } => FailureKind::InsufficientQuantity,
            AllocationError::Storage(_) => FailureKind::Storage,
            AllocationError::Interrupted { cause, .. } => cause.kind(),
        }
    }

    /// 失败前已生效的扣减（仅 Interrupted 非空）
    pub fn applied(&self) -> &[Consumption] {
        match self {
            AllocationError::Interrupted { applied, .. } => applied,
            _ => &[],
        }
    }

    /// 附加已生效的扣减；无扣减时原样返回
    pub fn with_applied(self, applied: Vec<Consumption>) -> Self {
        if applied.is_empty() {
            return self;
        }
        AllocationError::Interrupted {
            applied,
            cause: Box::new(self),
        }
    }
}

/// Result 类型别名
pub type AllocationOutcome<T> = Result<T, AllocationError>;
