// ==========================================
// 生产线平衡引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 原则: 所有错误均可在会话编辑层面恢复,不影响宿主进程
// ==========================================

use crate::domain::types::{InstanceId, OperatorId, SessionPhase};
use thiserror::Error;

/// 平衡引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BalancingError {
    // ===== 产品/工序清单 =====
    #[error("产品状态无效: product_id={product_id}, {reason}")]
    InvalidProductState { product_id: String, reason: String },

    #[error("产品无工序清单: product_id={product_id}")]
    NoOperationListFound { product_id: String },

    #[error("工序数据降级: 小时产能为 0, operation_ids={operation_ids:?}")]
    DegradedOperationData { operation_ids: Vec<String> },

    // ===== 产能不变量 =====
    #[error("工序无剩余产能: operation_id={operation_id}")]
    NoCapacityRemaining { operation_id: String },

    #[error("超出剩余产能: operation_id={operation_id}, requested_delta={requested_delta}, pending={pending}")]
    CapacityExceeded {
        operation_id: String,
        requested_delta: u32,
        pending: u32,
    },

    // ===== 引用查找 =====
    #[error("分配实例不存在: operator={operator_id}, instance_id={instance_id}")]
    AssignmentNotFound {
        operator_id: OperatorId,
        instance_id: InstanceId,
    },

    #[error("操作员不存在: {0}")]
    OperatorNotFound(OperatorId),

    #[error("工序不存在: {0}")]
    OperationNotFound(String),

    // ===== 输入校验（交互层拒绝） =====
    #[error("数量无效: {0}")]
    InvalidQuantity(i64),

    #[error("操作被拒绝: {0}")]
    InvalidIntent(String),

    #[error("人数无效: {0}（必须为正整数）")]
    InvalidHeadcount(i64),

    // ===== 会话状态 =====
    #[error("已保存会话数据不一致: {0}")]
    InvalidSavedSession(String),

    #[error("不变量被破坏: {0}")]
    InvariantViolation(String),

    #[error("会话未激活: phase={0}")]
    SessionNotActive(SessionPhase),

    // ===== 持久化 =====
    #[error("会话保存失败: {0}")]
    PersistenceFailure(String),
}

impl BalancingError {
    /// 是否为本地可恢复的不变量拒绝（变更被拒绝,状态未改变）
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BalancingError::NoCapacityRemaining { .. }
                | BalancingError::CapacityExceeded { .. }
                | BalancingError::AssignmentNotFound { .. }
                | BalancingError::OperatorNotFound(_)
                | BalancingError::OperationNotFound(_)
                | BalancingError::InvalidQuantity(_)
                | BalancingError::InvalidIntent(_)
                | BalancingError::InvalidHeadcount(_)
        )
    }

    /// 是否阻断流程进入下一步（选择产品 → 平衡 → 保存）
    pub fn blocks_workflow(&self) -> bool {
        matches!(
            self,
            BalancingError::InvalidProductState { .. }
                | BalancingError::NoOperationListFound { .. }
                | BalancingError::DegradedOperationData { .. }
                | BalancingError::InvalidSavedSession(_)
        )
    }
}

/// Result 类型别名
pub type BalancingResult<T> = Result<T, BalancingError>;

// ==========================================
// 外部协作方错误（工序清单 / 会话加载 / 持久化网关）
// ==========================================

/// 网关错误类型
///
/// 实现方（仓储层）负责把自身错误折算到这里
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("记录不存在: {entity} id={id}")]
    NotFound { entity: String, id: String },

    /// 存储暂不可用（连接失败、锁获取失败、保存被取消）
    #[error("存储不可用: {0}")]
    Unavailable(String),

    #[error("存储操作失败: {0}")]
    Storage(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
