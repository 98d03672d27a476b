// ==========================================
// 仓储库存系统 - 导入层
// ==========================================
// 职责: 外部数据导入（批次入库、出库请求文件）
// 支持: CSV
// ==========================================

pub mod batch_importer;
pub mod error;
pub mod field_mapper;
pub mod file_parser;

// 重导出核心类型
pub use batch_importer::{BatchImporter, ImportRowError, ImportSummary};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{map_batch_row, map_request_row, parse_instant, BatchRow};
pub use file_parser::{CsvParser, FileParser, RawRecord};
