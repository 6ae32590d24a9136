// ==========================================
// 生产线平衡引擎 - 领域类型定义
// ==========================================
// 职责: 标识符值对象、会话阶段
// 约束: 操作员与分配实例仅通过 ID 关联,不互相持有引用
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 每小时分钟数（UPH / 节拍换算基准）
pub const MINUTES_PER_HOUR: f64 = 60.0;

// ==========================================
// 操作员槽位 ID
// ==========================================
// 稳定标识,与显示名称和数组位置无关
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub u32);

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OP-{}", self.0)
    }
}

// ==========================================
// 分配实例 ID
// ==========================================
// 每次 assign 生成,修改数量时保持不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    /// 生成新的实例 ID (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// 平衡会话阶段
// ==========================================
// Uninitialized → Active → Discarded
// 所有变更操作仅在 Active 阶段有效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Uninitialized,
    Active,
    Discarded,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Uninitialized => write!(f, "UNINITIALIZED"),
            SessionPhase::Active => write!(f, "ACTIVE"),
            SessionPhase::Discarded => write!(f, "DISCARDED"),
        }
    }
}
