// ==========================================
// 生产线平衡引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope, 目前仅 global)
// ==========================================

use crate::config::balancing_config::{BalancingConfig, BalancingConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const DEFAULT_HEADCOUNT: &str = "balancing/default_headcount";
    pub const OPERATOR_NAME_PREFIX: &str = "balancing/operator_name_prefix";
    pub const SAVE_TIMEOUT_MS: &str = "balancing/save_timeout_ms";
    pub const BLOCK_SAVE_ON_DEGRADED_DATA: &str = "balancing/block_save_on_degraded_data";
}

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )?;

        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// 读取并解析配置值,缺失时使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_global_config_value(key)? {
            Some(raw) => raw.trim().parse::<T>().map_err(|e| -> Box<dyn Error> {
                format!("配置值格式错误 (key: {}, value: {}): {}", key, raw, e).into()
            }),
            None => Ok(default),
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// BalancingConfigReader trait 实现
// ==========================================
#[async_trait]
impl BalancingConfigReader for ConfigManager {
    async fn get_default_headcount(&self) -> Result<u32, Box<dyn Error>> {
        let defaults = BalancingConfig::default();
        let value =
            self.get_parsed_or_default(config_keys::DEFAULT_HEADCOUNT, defaults.default_headcount)?;
        if value == 0 {
            return Err(format!("{} 必须为正整数", config_keys::DEFAULT_HEADCOUNT).into());
        }
        Ok(value)
    }

    async fn get_operator_name_prefix(&self) -> Result<String, Box<dyn Error>> {
        let value = self
            .get_global_config_value(config_keys::OPERATOR_NAME_PREFIX)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(value.unwrap_or_else(|| BalancingConfig::default().operator_name_prefix))
    }

    async fn get_save_timeout_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::SAVE_TIMEOUT_MS,
            BalancingConfig::default().save_timeout_ms,
        )
    }

    async fn get_block_save_on_degraded_data(&self) -> Result<bool, Box<dyn Error>> {
        self.get_parsed_or_default(
            config_keys::BLOCK_SAVE_ON_DEGRADED_DATA,
            BalancingConfig::default().block_save_on_degraded_data,
        )
    }
}
