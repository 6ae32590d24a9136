// ==========================================
// 生产线平衡引擎 - 外部协作方接口
// ==========================================
// 职责: 定义引擎消费/产出的边界契约
// - OperationCatalog: 产品工序清单（只读）
// - SavedSessionLoader: 编辑模式加载已保存会话
// - PersistenceGateway: 保存会话（表头 + 操作员 + 分配）
// 说明: Engine 层定义 trait,Repository 层实现
// ==========================================

use crate::domain::operation::Operation;
use crate::domain::session::{SavedSession, SessionSnapshot};
use crate::engine::error::GatewayResult;
use async_trait::async_trait;

/// 工序清单适配器
pub trait OperationCatalog: Send + Sync {
    /// 获取产品的有序工序清单
    ///
    /// # 错误
    /// - `GatewayError::NotFound`: 产品无工序清单
    fn get_operations_for_product(&self, product_id: &str) -> GatewayResult<Vec<Operation>>;
}

/// 已保存会话加载器
pub trait SavedSessionLoader: Send + Sync {
    fn get_saved_assignments(&self, session_id: &str) -> GatewayResult<SavedSession>;
}

/// 持久化网关
///
/// 替换已有会话的操作员/分配记录必须是原子的（全部成功或全部不生效）,
/// 并发读者不得观察到“旧记录已删、新记录未写”的中间状态。
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// 保存会话
    ///
    /// # 参数
    /// - `session_id`: 已有会话ID（None 表示新建）
    /// - `snapshot`: 表头与操作员记录
    ///
    /// # 返回
    /// 会话ID
    async fn save_session(
        &self,
        session_id: Option<&str>,
        snapshot: &SessionSnapshot,
    ) -> GatewayResult<String>;
}
