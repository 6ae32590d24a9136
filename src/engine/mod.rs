// ==========================================
// 生产线平衡引擎 - 引擎层
// ==========================================
// 职责: 实现平衡规则（状态存储、指标计算、交互校验、流程编排）
// 红线: Engine 不拼 SQL, 外部协作方经 gateway trait 接入
// ==========================================

pub mod balancing_store;
pub mod calculator;
pub mod error;
pub mod events;
pub mod gateway;
pub mod interaction;
pub mod workflow;

// 重导出核心引擎
pub use balancing_store::{BalancingStore, QuantityChange};
pub use calculator::{BalancingCalculator, BalancingMetrics, OperatorLoad, WorkloadSummary};
pub use error::{BalancingError, BalancingResult, GatewayError, GatewayResult};
pub use events::{
    BalancingEvent, BalancingEventPublisher, LoggingEventPublisher, NoOpEventPublisher,
    OptionalEventPublisher,
};
pub use gateway::{OperationCatalog, PersistenceGateway, SavedSessionLoader};
pub use interaction::{AssignmentController, PlacementIntent};
pub use workflow::{BalancingWorkflow, PendingSave, QuantityDialog};
