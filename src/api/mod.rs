// ==========================================
// 生产线平衡引擎 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供前端/命令行调用
// ==========================================

pub mod balancing_api;
pub mod config_api;
pub mod error;

// 重导出核心类型
pub use balancing_api::{
    AssignmentView, BalancingApi, BoardView, HeadcountChangeView, OperatorView, PoolEntryView,
};
pub use config_api::ConfigApi;
pub use error::{ApiError, ApiResult, ErrorResponse};
