// ==========================================
// 仓储库存系统 - 字段映射
// ==========================================
// 职责: 原始行记录 → 领域对象（NewBatch / ExportRequest）
// 日期: RFC3339 时刻按时区归一到 UTC；纯日期按 UTC 零点
// ==========================================

use crate::domain::batch::NewBatch;
use crate::domain::request::ExportRequest;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRecord;
use chrono::{DateTime, NaiveDate, Utc};

/// 批次导入列
pub mod columns {
    pub const PRODUCT_ID: &str = "product_id";
    pub const QUANTITY: &str = "quantity";
    pub const EXPIRATION_DATE: &str = "expiration_date";
    pub const MANUFACTURING_DATE: &str = "manufacturing_date";
    pub const SUPPLIER: &str = "supplier";
    pub const CUSTOMER_ID: &str = "customer_id";
}

/// 映射后的批次行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    pub new_batch: NewBatch,
    pub supplier: Option<String>,
}

/// 解析时间
///
/// 支持: RFC3339（带时区）/ YYYY-MM-DD / YYYYMMDD
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_empty<'a>(record: &'a RawRecord, field: &str) -> Option<&'a str> {
    record
        .get(field)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn required<'a>(record: &'a RawRecord, row: usize, field: &str) -> ImportResult<&'a str> {
    non_empty(record, field).ok_or_else(|| ImportError::FieldMissing {
        row,
        field: field.to_string(),
    })
}

fn required_i64(record: &RawRecord, row: usize, field: &str) -> ImportResult<i64> {
    let raw = required(record, row, field)?;
    raw.parse::<i64>().map_err(|e| ImportError::TypeConversionError {
        row,
        field: field.to_string(),
        message: format!("{} ({})", raw, e),
    })
}

fn positive_i64(record: &RawRecord, row: usize, field: &str) -> ImportResult<i64> {
    let value = required_i64(record, row, field)?;
    if value <= 0 {
        return Err(ImportError::NonPositiveValue {
            row,
            field: field.to_string(),
            value,
        });
    }
    Ok(value)
}

fn optional_instant(record: &RawRecord, row: usize, field: &str) -> ImportResult<Option<DateTime<Utc>>> {
    match non_empty(record, field) {
        None => Ok(None),
        Some(raw) => parse_instant(raw)
            .map(Some)
            .ok_or_else(|| ImportError::DateFormatError {
                row,
                field: field.to_string(),
                value: raw.to_string(),
            }),
    }
}

/// 映射批次行
pub fn map_batch_row(row: usize, record: &RawRecord) -> ImportResult<BatchRow> {
    let product_id = required_i64(record, row, columns::PRODUCT_ID)?;
    let quantity = positive_i64(record, row, columns::QUANTITY)?;

    let raw_expiration = required(record, row, columns::EXPIRATION_DATE)?;
    let expiration_date = parse_instant(raw_expiration).ok_or_else(|| ImportError::DateFormatError {
        row,
        field: columns::EXPIRATION_DATE.to_string(),
        value: raw_expiration.to_string(),
    })?;
    let manufacturing_date = optional_instant(record, row, columns::MANUFACTURING_DATE)?;

    Ok(BatchRow {
        new_batch: NewBatch {
            product_id,
            quantity,
            expiration_date,
            manufacturing_date,
        },
        supplier: non_empty(record, columns::SUPPLIER).map(str::to_string),
    })
}

/// 映射出库请求行
///
/// 数量只做类型转换；数量合法性由提交入口统一校验
pub fn map_request_row(row: usize, record: &RawRecord) -> ImportResult<ExportRequest> {
    let product_id = required_i64(record, row, columns::PRODUCT_ID)?;
    let quantity = required_i64(record, row, columns::QUANTITY)?;

    let request = ExportRequest::new(product_id, quantity);
    Ok(match non_empty(record, columns::CUSTOMER_ID) {
        Some(customer) => request.with_customer(customer),
        None => request,
    })
}
