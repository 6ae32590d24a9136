// ==========================================
// 生产线平衡引擎 - 配置管理 API
// ==========================================
// 职责: 平衡配置查询、更新、快照
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::balancing_config::{BalancingConfig, BalancingConfigReader};
use crate::config::config_manager::{config_keys, ConfigManager};

/// 可写入的配置键
const KNOWN_KEYS: [&str; 4] = [
    config_keys::DEFAULT_HEADCOUNT,
    config_keys::OPERATOR_NAME_PREFIX,
    config_keys::SAVE_TIMEOUT_MS,
    config_keys::BLOCK_SAVE_ON_DEGRADED_DATA,
];

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 读取当前平衡配置（缺失项使用默认值）
    pub async fn get_balancing_config(&self) -> ApiResult<BalancingConfig> {
        let result = self.config_manager.load_balancing_config().await;
        result.map_err(|e| ApiError::ValidationError(e.to_string()))
    }

    /// 更新单个配置项
    ///
    /// # 参数
    /// - key: 配置键（仅限 balancing/* 已知键）
    /// - value: 配置值（写入前按键类型校验）
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        if !KNOWN_KEYS.contains(&key) {
            return Err(ApiError::InvalidInput(format!("未知配置键: {}", key)));
        }

        let value = value.trim();
        let valid = match key {
            config_keys::DEFAULT_HEADCOUNT => value.parse::<u32>().map(|v| v > 0).unwrap_or(false),
            config_keys::SAVE_TIMEOUT_MS => value.parse::<u64>().map(|v| v > 0).unwrap_or(false),
            config_keys::BLOCK_SAVE_ON_DEGRADED_DATA => value.parse::<bool>().is_ok(),
            _ => !value.is_empty(),
        };
        if !valid {
            return Err(ApiError::InvalidInput(format!(
                "配置值无效: key={}, value={}",
                key, value
            )));
        }

        self.config_manager
            .set_global_config_value(key, value)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    /// 配置快照（JSON）
    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        self.config_manager
            .get_config_snapshot()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }
}
