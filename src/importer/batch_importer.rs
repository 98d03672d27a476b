// ==========================================
// 仓储库存系统 - 批次入库
// ==========================================
// 职责: 单批次入库（批次 + 入库单）与 CSV 批量入库
// 规则: CSV 中校验失败的行逐行记录，不中断其它行
// 说明: 批次与入库单分两次写入，不在同一事务
// ==========================================

use crate::domain::batch::{Batch, NewBatch};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::map_batch_row;
use crate::importer::file_parser::{CsvParser, FileParser};
use crate::repository::{BatchRepository, ReceiptRepository};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// 行级导入失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRowError {
    pub row: usize,
    pub message: String,
}

/// 批量导入汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: Vec<Batch>,
    pub rejected: Vec<ImportRowError>,
}

impl ImportSummary {
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

// ==========================================
// BatchImporter - 批次入库
// ==========================================
pub struct BatchImporter {
    batch_repo: Arc<BatchRepository>,
    receipt_repo: Arc<ReceiptRepository>,
    parser: Box<dyn FileParser>,
}

impl BatchImporter {
    pub fn new(batch_repo: Arc<BatchRepository>, receipt_repo: Arc<ReceiptRepository>) -> Self {
        Self {
            batch_repo,
            receipt_repo,
            parser: Box::new(CsvParser),
        }
    }

    /// 单批次入库
    ///
    /// # 参数
    /// - `new_batch`: 待入库批次（quantity 必须 > 0；manufacturing_date 缺省为入库时间）
    /// - `supplier`: 供应商
    ///
    /// # 返回
    /// 已入库的批次
    #[instrument(skip(self, new_batch), fields(
        product_id = new_batch.product_id,
        quantity = new_batch.quantity
    ))]
    pub fn import_one(&self, mut new_batch: NewBatch, supplier: Option<&str>) -> ImportResult<Batch> {
        if new_batch.quantity <= 0 {
            return Err(ImportError::NonPositiveValue {
                row: 0,
                field: "quantity".to_string(),
                value: new_batch.quantity,
            });
        }

        let now = Utc::now();
        if new_batch.manufacturing_date.is_none() {
            new_batch.manufacturing_date = Some(now);
        }

        let batch = self.batch_repo.insert(&new_batch, now)?;
        self.receipt_repo
            .insert_import_receipt(supplier, batch.id, batch.quantity, now)?;

        tracing::info!(
            "批次入库完成: batch_id={}, product_id={}, quantity={}, expiration={}",
            batch.id,
            batch.product_id,
            batch.quantity,
            batch.expiration_date
        );
        Ok(batch)
    }

    /// CSV 批量入库
    ///
    /// 列: product_id, quantity, expiration_date, manufacturing_date?, supplier?
    ///
    /// # 返回
    /// - Ok(ImportSummary): 成功行与失败行
    /// - Err: 文件级错误（不存在/格式/解析）
    #[instrument(skip(self, file_path), fields(file = %file_path.display()))]
    pub fn import_csv(&self, file_path: &Path) -> ImportResult<ImportSummary> {
        let records = self.parser.parse_to_raw_records(file_path)?;
        let mut summary = ImportSummary::default();

        for (row, record) in records {
            let outcome = map_batch_row(row, &record)
                .and_then(|mapped| self.import_one(mapped.new_batch, mapped.supplier.as_deref()));

            match outcome {
                Ok(batch) => summary.imported.push(batch),
                Err(e) => {
                    tracing::warn!("导入行被拒绝: row={}, error={}", row, e);
                    summary.rejected.push(ImportRowError {
                        row,
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "CSV 导入完成: imported={}, rejected={}",
            summary.imported_count(),
            summary.rejected_count()
        );
        Ok(summary)
    }
}
