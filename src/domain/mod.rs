// ==========================================
// 生产线平衡引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、边界记录
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod operation;
pub mod operator;
pub mod session;
pub mod types;

// 重导出核心类型
pub use operation::{Operation, OperationCapacity};
pub use operator::{OperationAssignment, Operator};
pub use session::{
    AssignmentRecord, OperatorRecord, SavedAssignment, SavedOperator, SavedSession,
    SessionHeader, SessionSnapshot,
};
pub use types::{InstanceId, OperatorId, SessionPhase, MINUTES_PER_HOUR};
