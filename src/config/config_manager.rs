// ==========================================
// 仓储库存系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::db::configure_sqlite_connection;
use crate::engine::expiry::DEFAULT_URGENT_DAYS;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "WAREHOUSE_INVENTORY_DB_PATH";

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // 临期视图
    pub const EXPIRING_TOP_K: &str = "expiring_top_k";
    pub const URGENT_DAYS: &str = "urgent_days";

    // 请求队列
    pub const HISTORY_LIMIT: &str = "history_limit";
}

// ==========================================
// InventoryConfig - 配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// 临期视图默认展示数量
    pub expiring_top_k: usize,
    /// 紧急阈值（天）
    pub urgent_days: i64,
    /// 请求历史保留条数（默认 0，保留全部入队记录）
    pub history_limit: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            expiring_top_k: 3,
            urgent_days: DEFAULT_URGENT_DAYS,
            history_limit: 0,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        tracing::info!("配置已更新: {}={}", key, value);
        Ok(())
    }

    /// 读取并解析配置值，缺失或无法解析时使用默认值
    fn get_parsed_or<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: std::str::FromStr,
    {
        let parsed = match self.get_value(key)? {
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => v,
                Err(_) => {
                    tracing::warn!("配置值无法解析，使用默认值: key={}, value={}", key, raw);
                    default
                }
            },
            None => default,
        };
        Ok(parsed)
    }

    /// 加载配置快照
    pub fn load(&self) -> RepositoryResult<InventoryConfig> {
        let defaults = InventoryConfig::default();
        Ok(InventoryConfig {
            expiring_top_k: self.get_parsed_or(config_keys::EXPIRING_TOP_K, defaults.expiring_top_k)?,
            urgent_days: self.get_parsed_or(config_keys::URGENT_DAYS, defaults.urgent_days)?,
            history_limit: self.get_parsed_or(config_keys::HISTORY_LIMIT, defaults.history_limit)?,
        })
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&config_map)
            .map_err(|e| RepositoryError::InternalError(format!("配置快照序列化失败: {}", e)))
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./warehouse_inventory.db");

    if let Some(data_dir) = dirs::data_dir() {
        let app_dir = data_dir.join("warehouse-inventory");
        match std::fs::create_dir_all(&app_dir) {
            Ok(()) => path = app_dir.join("warehouse_inventory.db"),
            Err(e) => tracing::warn!("无法创建数据目录，使用当前目录: {}", e),
        }
    }

    path.to_string_lossy().to_string()
}
