// ==========================================
// 生产线平衡引擎 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,将引擎/仓储/导入错误转换为用户友好的错误消息
// 要求: 所有错误信息必须包含显式原因
// ==========================================

use crate::engine::error::BalancingError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 平衡业务错误
    // ==========================================
    /// 引擎拒绝的操作（会话保持不变）
    #[error(transparent)]
    Balancing(BalancingError),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定错误代码（前端据此分支）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Balancing(e) => match e {
                BalancingError::InvalidProductState { .. } => "INVALID_PRODUCT_STATE",
                BalancingError::NoOperationListFound { .. } => "NO_OPERATION_LIST_FOUND",
                BalancingError::DegradedOperationData { .. } => "DEGRADED_OPERATION_DATA",
                BalancingError::NoCapacityRemaining { .. } => "NO_CAPACITY_REMAINING",
                BalancingError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
                BalancingError::AssignmentNotFound { .. } => "ASSIGNMENT_NOT_FOUND",
                BalancingError::OperatorNotFound(_) => "OPERATOR_NOT_FOUND",
                BalancingError::OperationNotFound(_) => "OPERATION_NOT_FOUND",
                BalancingError::InvalidQuantity(_) => "INVALID_QUANTITY",
                BalancingError::InvalidIntent(_) => "INVALID_INTENT",
                BalancingError::InvalidHeadcount(_) => "INVALID_HEADCOUNT",
                BalancingError::InvalidSavedSession(_) => "INVALID_SAVED_SESSION",
                BalancingError::InvariantViolation(_) => "INVARIANT_VIOLATION",
                BalancingError::SessionNotActive(_) => "SESSION_NOT_ACTIVE",
                BalancingError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            },
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::ImportError(_) => "IMPORT_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }

    /// 可恢复错误: 用户修正输入即可重试,会话未受影响
    pub fn is_recoverable(&self) -> bool {
        match self {
            ApiError::Balancing(e) => e.is_recoverable(),
            ApiError::InvalidInput(_) | ApiError::NotFound(_) | ApiError::ValidationError(_) => {
                true
            }
            _ => false,
        }
    }

    /// 转换为前端错误响应
    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            ApiError::Balancing(BalancingError::CapacityExceeded {
                operation_id,
                requested_delta,
                pending,
            }) => Some(serde_json::json!({
                "operation_id": operation_id,
                "requested_delta": requested_delta,
                "pending": pending,
            })),
            ApiError::Balancing(BalancingError::DegradedOperationData { operation_ids }) => {
                Some(serde_json::json!({ "operation_ids": operation_ids }))
            }
            _ => None,
        };

        ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            recoverable: self.is_recoverable(),
            details,
        }
    }
}

/// 错误响应（返回给前端）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 是否可恢复
    pub recoverable: bool,

    /// 详细信息（可选）
    pub details: Option<serde_json::Value>,
}

impl From<BalancingError> for ApiError {
    fn from(err: BalancingError) -> Self {
        ApiError::Balancing(err)
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件不存在: {}", path)),
            e @ (ImportError::PrimaryKeyMissing(_)
            | ImportError::DuplicateOperation { .. }
            | ImportError::TypeConversionError { .. }
            | ImportError::MissingColumn(_)) => ApiError::ValidationError(e.to_string()),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
