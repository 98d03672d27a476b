// ==========================================
// 仓储库存系统 - 配置层
// ==========================================
// 职责: 系统配置管理（config_kv 表 + 默认值）
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, get_default_db_path, ConfigManager, InventoryConfig};
