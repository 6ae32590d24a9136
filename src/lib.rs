// ==========================================
// 生产线平衡引擎 - 核心库
// ==========================================
// 职责: 将产品工序分配给操作员,计算节拍、负荷与设备需求
// 技术栈: Rust + SQLite
// 系统定位: 人工/辅助平衡工具（不做自动寻优）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{InstanceId, OperatorId, SessionPhase};

// 领域实体
pub use domain::{
    Operation, OperationAssignment, OperationCapacity, Operator, SavedSession, SessionSnapshot,
};

// 引擎
pub use engine::{
    AssignmentController, BalancingCalculator, BalancingError, BalancingMetrics, BalancingStore,
    BalancingWorkflow, PlacementIntent,
};

// API
pub use api::{ApiError, BalancingApi, ConfigApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "生产线平衡引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
