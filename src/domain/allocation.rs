// ==========================================
// 仓储库存系统 - 分配结果与排空台账
// ==========================================
// 职责: 定义单次分配的结果、台账条目及失败类型
// 说明: 部分满足 (remaining_unfulfilled > 0) 不是错误，记为成功 + 缺口
// ==========================================

use crate::domain::request::ExportRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Consumption - 单个批次的消耗记录
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumption {
    pub batch_id: i64,
    pub quantity: i64,
}

// ==========================================
// AllocationResult - 单个请求的分配结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// 来源请求ID
    pub request_id: String,
    /// 商品ID
    pub product_id: i64,
    /// 请求数量
    pub requested_quantity: i64,
    /// 按消耗顺序（过期时间升序）排列的明细
    pub consumed: Vec<Consumption>,
    /// 未满足数量（0 表示完全满足）
    pub remaining_unfulfilled: i64,
}

impl AllocationResult {
    /// 实际出库数量
    pub fn fulfilled_quantity(&self) -> i64 {
        self.consumed.iter().map(|c| c.quantity).sum()
    }

    /// 是否完全满足
    pub fn is_fully_satisfied(&self) -> bool {
        self.remaining_unfulfilled == 0
    }

    /// 是否部分满足（有缺口）
    pub fn is_partial(&self) -> bool {
        self.remaining_unfulfilled > 0
    }
}

// ==========================================
// FailureKind - 台账中的失败类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    InvalidQuantity,
    OutOfStock,
    BatchNotFound,
    InsufficientQuantity,
    Storage,
}

impl FailureKind {
    pub fn as_str(&self) -> &str {
        match self {
            FailureKind::InvalidQuantity => "INVALID_QUANTITY",
            FailureKind::OutOfStock => "OUT_OF_STOCK",
            FailureKind::BatchNotFound => "BATCH_NOT_FOUND",
            FailureKind::InsufficientQuantity => "INSUFFICIENT_QUANTITY",
            FailureKind::Storage => "STORAGE",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// RequestOutcome / LedgerEntry - 排空台账
// ==========================================

/// 单个请求的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// 分配成功（可能带缺口）
    Success {
        result: AllocationResult,
        /// 出库单ID（未配置单据记录器或记录失败时为 None）
        receipt_id: Option<i64>,
    },
    /// 分配失败（不影响后续请求）
    Failed {
        kind: FailureKind,
        message: String,
        /// 失败前已生效的扣减（不回滚；未发生扣减时为空）
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        applied: Vec<Consumption>,
        /// 已生效扣减对应的出库单ID
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receipt_id: Option<i64>,
    },
}

/// 台账条目（按出队顺序排列）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub request: ExportRequest,
    #[serde(flatten)]
    pub outcome: RequestOutcome,
}

impl LedgerEntry {
    pub fn success(request: ExportRequest, result: AllocationResult, receipt_id: Option<i64>) -> Self {
        Self {
            request,
            outcome: RequestOutcome::Success { result, receipt_id },
        }
    }

    pub fn failed(request: ExportRequest, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            request,
            outcome: RequestOutcome::Failed {
                kind,
                message: message.into(),
                applied: Vec::new(),
                receipt_id: None,
            },
        }
    }

    /// 中途失败：写入协作方失败前已有扣减生效
    pub fn interrupted(
        request: ExportRequest,
        kind: FailureKind,
        message: impl Into<String>,
        applied: Vec<Consumption>,
        receipt_id: Option<i64>,
    ) -> Self {
        Self {
            request,
            outcome: RequestOutcome::Failed {
                kind,
                message: message.into(),
                applied,
                receipt_id,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RequestOutcome::Success { .. })
    }

    /// 分配结果（仅成功条目）
    pub fn result(&self) -> Option<&AllocationResult> {
        match &self.outcome {
            RequestOutcome::Success { result, .. } => Some(result),
            RequestOutcome::Failed { .. } => None,
        }
    }

    /// 失败类型（仅失败条目）
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            RequestOutcome::Success { .. } => None,
            RequestOutcome::Failed { kind, .. } => Some(*kind),
        }
    }

    /// 已从库存扣减的明细（成功为消耗明细，失败为中断前已生效的扣减）
    pub fn applied(&self) -> &[Consumption] {
        match &self.outcome {
            RequestOutcome::Success { result, .. } => &result.consumed,
            RequestOutcome::Failed { applied, .. } => applied,
        }
    }

    pub fn receipt_id(&self) -> Option<i64> {
        match &self.outcome {
            RequestOutcome::Success { receipt_id, .. } | RequestOutcome::Failed { receipt_id, .. } => {
                *receipt_id
            }
        }
    }

    /// 缺口数量（失败条目返回 None）
    pub fn shortfall(&self) -> Option<i64> {
        self.result().map(|r| r.remaining_unfulfilled)
    }
}
