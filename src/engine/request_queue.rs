// ==========================================
// 仓储库存系统 - 出库请求队列
// ==========================================
// 职责: 严格 FIFO 缓冲待处理的出库请求
// 附加: history 日志保留全部入队记录（最新在前），与出队无关
// 说明: 队列不设容量上限，背压由调用方负责
// ==========================================

use crate::domain::request::ExportRequest;
use std::collections::VecDeque;

// ==========================================
// RequestQueue - FIFO 请求队列
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    pending: VecDeque<ExportRequest>,
    history: VecDeque<ExportRequest>,
    /// 历史日志上限（0 表示不限制）
    history_limit: usize,
}

impl RequestQueue {
    /// 构造空队列（历史日志不限长度）
    pub fn new() -> Self {
        Self::default()
    }

    /// 构造空队列，并限制历史日志长度
    ///
    /// # 参数
    /// - `history_limit`: 保留的最近入队记录数（0 表示不限制）
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            history_limit,
            ..Self::default()
        }
    }

    /// 入队 - O(1) 均摊
    ///
    /// # 返回
    /// 入队后的队列长度（即该请求的排队位置）
    pub fn enqueue(&mut self, request: ExportRequest) -> usize {
        self.history.push_front(request.clone());
        if self.history_limit > 0 {
            self.history.truncate(self.history_limit);
        }
        self.pending.push_back(request);
        self.pending.len()
    }

    /// 出队 - O(1)，严格按入队顺序
    pub fn dequeue(&mut self) -> Option<ExportRequest> {
        self.pending.pop_front()
    }

    pub fn size(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// 入队历史（最新在前）
    pub fn history(&self) -> impl Iterator<Item = &ExportRequest> {
        self.history.iter()
    }
}
