// ==========================================
// 生产线平衡引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod balancing_session_repo;
pub mod error;
pub mod operation_catalog_repo;

// 重导出核心仓储
pub use balancing_session_repo::{BalancingSessionRepository, SessionSummary};
pub use error::{RepositoryError, RepositoryResult};
pub use operation_catalog_repo::{OperationCatalogRepository, ProductSummary};
