// ==========================================
// 仓储库存系统 - 效期优先批次选择器
// ==========================================
// 职责: 按过期时间升序逐个产出批次（最小堆）
// 排序键: expiration_date（UTC 时刻比较，不按日期字符串比较）
// 同过期时间: 按插入顺序产出（固定插入序列下结果确定）
// ==========================================

use crate::domain::batch::Batch;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// 堆节点（插入序号用于同过期时间时的确定性排序）
#[derive(Debug, Clone)]
struct HeapEntry {
    batch: Batch,
    seq: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap 为最大堆，反转比较得到最小堆
        other
            .batch
            .expiration_date
            .cmp(&self.batch.expiration_date)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ==========================================
// PriorityBatchSelector - 批次最小堆
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PriorityBatchSelector {
    heap: BinaryHeap<HeapEntry>,
    next_seq: u64,
}

impl PriorityBatchSelector {
    /// 构造空选择器
    pub fn new() -> Self {
        Self::default()
    }

    /// 由批次集合构建选择器（按迭代顺序插入）
    pub fn from_batches<I>(batches: I) -> Self
    where
        I: IntoIterator<Item = Batch>,
    {
        let mut selector = Self::new();
        for batch in batches {
            selector.insert(batch);
        }
        selector
    }

    /// 插入批次 - O(log n)
    ///
    /// 不校验数量；数量为 0 的批次应由调用方在插入前过滤
    pub fn insert(&mut self, batch: Batch) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry { batch, seq });
    }

    /// 查看最早过期的批次（不移除）- O(1)
    pub fn peek_min(&self) -> Option<&Batch> {
        self.heap.peek().map(|entry| &entry.batch)
    }

    /// 取出最早过期的批次 - O(log n)
    pub fn extract_min(&mut self) -> Option<Batch> {
        self.heap.pop().map(|entry| entry.batch)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// 最早过期的 k 个批次（不修改选择器）- O(n + k log n)
    pub fn top_k(&self, k: usize) -> Vec<Batch> {
        let mut clone = self.heap.clone();
        let mut top = Vec::with_capacity(k.min(clone.len()));
        while top.len() < k {
            match clone.pop() {
                Some(entry) => top.push(entry.batch),
                None => break,
            }
        }
        top
    }

    /// 依次取出全部批次（过期时间升序）
    pub fn into_sorted_vec(mut self) -> Vec<Batch> {
        let mut sorted = Vec::with_capacity(self.heap.len());
        while let Some(batch) = self.extract_min() {
            sorted.push(batch);
        }
        sorted
    }
}
