// ==========================================
// 生产线平衡引擎 - 平衡配置与读取 Trait
// ==========================================
// 职责: 定义平衡引擎所需的配置项及读取接口（不包含实现）
// 实现者: ConfigManager（从 config_kv 表读取）
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// 平衡引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancingConfig {
    /// 选择产品时的默认人数
    pub default_headcount: u32,
    /// 默认操作员名称前缀（"Operator 1"）
    pub operator_name_prefix: String,
    /// 保存超时（毫秒）
    pub save_timeout_ms: u64,
    /// 存在无产能工序时是否阻止保存
    pub block_save_on_degraded_data: bool,
}

impl Default for BalancingConfig {
    fn default() -> Self {
        Self {
            default_headcount: 1,
            operator_name_prefix: "Operator".to_string(),
            save_timeout_ms: 10_000,
            block_save_on_degraded_data: true,
        }
    }
}

// ==========================================
// BalancingConfigReader Trait
// ==========================================
#[async_trait]
pub trait BalancingConfigReader: Send + Sync {
    /// 默认人数（默认 1）
    async fn get_default_headcount(&self) -> Result<u32, Box<dyn Error>>;

    /// 操作员名称前缀（默认 "Operator"）
    async fn get_operator_name_prefix(&self) -> Result<String, Box<dyn Error>>;

    /// 保存超时毫秒（默认 10000）
    async fn get_save_timeout_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// 降级数据是否阻止保存（默认 true）
    async fn get_block_save_on_degraded_data(&self) -> Result<bool, Box<dyn Error>>;

    /// 读取完整配置
    async fn load_balancing_config(&self) -> Result<BalancingConfig, Box<dyn Error>> {
        let default_headcount = self.get_default_headcount().await?;
        let operator_name_prefix = self.get_operator_name_prefix().await?;
        let save_timeout_ms = self.get_save_timeout_ms().await?;
        let block_save_on_degraded_data = self.get_block_save_on_degraded_data().await?;

        Ok(BalancingConfig {
            default_headcount,
            operator_name_prefix,
            save_timeout_ms,
            block_save_on_degraded_data,
        })
    }
}
