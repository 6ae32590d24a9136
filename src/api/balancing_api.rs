// ==========================================
// 生产线平衡引擎 - 平衡会话 API
// ==========================================
// 职责: 向前端暴露平衡流程（选择产品、拖放分配、人数调整、保存）
// 约束: 同一时刻只有一个活动会话;所有变更串行执行
// 约束: 保存期间不持有会话锁,保存完成后按修订号记录保存状态
// ==========================================

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::config::balancing_config::BalancingConfig;
use crate::domain::types::{InstanceId, OperatorId, SessionPhase};
use crate::engine::calculator::WorkloadSummary;
use crate::engine::error::BalancingError;
use crate::engine::events::BalancingEventPublisher;
use crate::engine::interaction::PlacementIntent;
use crate::engine::workflow::{BalancingWorkflow, QuantityDialog};
use crate::importer::{ImportSummary, OperationCatalogImporter};
use crate::repository::{
    BalancingSessionRepository, OperationCatalogRepository, ProductSummary, SessionSummary,
};

// ==========================================
// 看板视图 DTO
// ==========================================

/// 工序池条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntryView {
    pub operation_id: String,
    pub name: String,
    pub process_id: String,
    pub standard_time_minutes: f64,
    pub total_units_per_hour: u32,
    pub assigned_units_per_hour: u32,
    pub pending_units_per_hour: u32,
    /// 小时产能为 0（不可分配）
    pub degraded: bool,
}

/// 操作员卡片上的分配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentView {
    pub instance_id: String,
    pub operation_id: String,
    pub operation_name: String,
    pub assigned_units_per_hour: u32,
}

/// 操作员卡片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorView {
    pub operator_id: u32,
    pub display_name: String,
    pub occupied_minutes: f64,
    pub occupancy_percentage: f64,
    pub assignments: Vec<AssignmentView>,
}

/// 平衡看板（一次渲染所需的全部数据）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    pub session_id: Option<String>,
    pub product_id: String,
    pub headcount: u32,
    pub revision: u64,
    pub unsaved_changes: bool,
    pub total_standard_time: f64,
    pub units_per_hour: u64,
    pub takt_time: f64,
    pub required_machines: f64,
    pub unassigned_minutes: f64,
    pub pool: Vec<PoolEntryView>,
    pub operators: Vec<OperatorView>,
    pub summary: WorkloadSummary,
}

/// 人数调整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadcountChangeView {
    /// 被移除操作员上释放回工序池的分配数
    pub released_assignments: usize,
    pub released_units_per_hour: u64,
    pub board: BoardView,
}

// ==========================================
// BalancingApi - 平衡会话 API
// ==========================================

/// 平衡会话API
///
/// 职责：
/// 1. 会话生命周期（新建、打开已保存、放弃）
/// 2. 分配交互（放置、移动、调整数量、移除、重命名）
/// 3. 保存（快照 → 仓储,带超时）
/// 4. 工序清单导入与查询
pub struct BalancingApi {
    workflow: Mutex<BalancingWorkflow>,
    catalog_repo: Arc<OperationCatalogRepository>,
    session_repo: Arc<BalancingSessionRepository>,
    importer: OperationCatalogImporter,
}

impl BalancingApi {
    /// 创建新的BalancingApi实例
    pub fn new(
        config: BalancingConfig,
        catalog_repo: Arc<OperationCatalogRepository>,
        session_repo: Arc<BalancingSessionRepository>,
        event_publisher: Option<Arc<dyn BalancingEventPublisher>>,
    ) -> Self {
        Self {
            workflow: Mutex::new(BalancingWorkflow::new(config, event_publisher)),
            importer: OperationCatalogImporter::new(catalog_repo.clone()),
            catalog_repo,
            session_repo,
        }
    }

    fn lock(&self) -> ApiResult<MutexGuard<'_, BalancingWorkflow>> {
        self.workflow
            .lock()
            .map_err(|e| ApiError::InternalError(format!("会话锁获取失败: {}", e)))
    }

    // ==========================================
    // 会话生命周期
    // ==========================================

    /// 选择产品,创建新会话
    ///
    /// # 参数
    /// - product_id: 产品ID
    /// - headcount: 人数（None 使用配置默认值）
    #[instrument(skip(self))]
    pub fn start_session(&self, product_id: &str, headcount: Option<i64>) -> ApiResult<BoardView> {
        if product_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("产品ID不能为空".to_string()));
        }
        let headcount = match headcount {
            Some(h) => Some(
                u32::try_from(h)
                    .ok()
                    .filter(|v| *v > 0)
                    .ok_or(BalancingError::InvalidHeadcount(h))?,
            ),
            None => None,
        };

        let mut wf = self.lock()?;
        wf.select_product(self.catalog_repo.as_ref(), product_id.trim(), headcount)?;
        info!(product_id, "平衡会话已创建");
        Self::board(&wf)
    }

    /// 打开已保存会话（编辑模式）
    #[instrument(skip(self))]
    pub fn open_session(&self, session_id: &str) -> ApiResult<BoardView> {
        let mut wf = self.lock()?;
        wf.open_saved(
            self.catalog_repo.as_ref(),
            self.session_repo.as_ref(),
            session_id,
        )?;
        Self::board(&wf)
    }

    /// 放弃当前会话
    pub fn discard_session(&self) -> ApiResult<()> {
        self.lock()?.discard()?;
        Ok(())
    }

    /// 当前会话阶段
    pub fn phase(&self) -> ApiResult<SessionPhase> {
        Ok(self.lock()?.phase())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 当前看板
    pub fn get_board(&self) -> ApiResult<BoardView> {
        let wf = self.lock()?;
        Self::board(&wf)
    }

    /// 数量对话框参数（拖放到操作员时弹出）
    pub fn quantity_dialog(&self, operation_id: &str) -> ApiResult<QuantityDialog> {
        Ok(self.lock()?.quantity_dialog(operation_id)?)
    }

    pub fn has_unsaved_changes(&self) -> ApiResult<bool> {
        Ok(self.lock()?.has_unsaved_changes())
    }

    // ==========================================
    // 分配交互
    // ==========================================

    /// 将工序放到操作员上
    ///
    /// # 参数
    /// - units: 分配数量（None 时分配全部剩余产能）
    pub fn place_operation(
        &self,
        operation_id: &str,
        operator_id: u32,
        units: Option<i64>,
    ) -> ApiResult<BoardView> {
        let mut intent = PlacementIntent::new(operation_id, OperatorId(operator_id));
        if let Some(units) = units {
            intent = intent.with_units(units);
        }

        let mut wf = self.lock()?;
        wf.place(&intent)?;
        Self::board(&wf)
    }

    /// 在操作员之间移动分配
    pub fn move_assignment(
        &self,
        from_operator: u32,
        instance_id: &str,
        to_operator: u32,
        units: Option<i64>,
    ) -> ApiResult<BoardView> {
        let instance_id = parse_instance_id(instance_id)?;
        let mut wf = self.lock()?;
        wf.move_assignment(
            OperatorId(from_operator),
            instance_id,
            OperatorId(to_operator),
            units,
        )?;
        Self::board(&wf)
    }

    /// 调整分配数量
    pub fn resize_assignment(
        &self,
        operator_id: u32,
        instance_id: &str,
        new_units: i64,
    ) -> ApiResult<BoardView> {
        let instance_id = parse_instance_id(instance_id)?;
        let mut wf = self.lock()?;
        wf.resize_assignment(OperatorId(operator_id), instance_id, new_units)?;
        Self::board(&wf)
    }

    /// 移除分配（数量回到工序池）
    pub fn remove_assignment(&self, operator_id: u32, instance_id: &str) -> ApiResult<BoardView> {
        let instance_id = parse_instance_id(instance_id)?;
        let mut wf = self.lock()?;
        wf.remove_assignment(OperatorId(operator_id), instance_id)?;
        Self::board(&wf)
    }

    pub fn rename_operator(&self, operator_id: u32, new_name: &str) -> ApiResult<BoardView> {
        let mut wf = self.lock()?;
        wf.rename_operator(OperatorId(operator_id), new_name)?;
        Self::board(&wf)
    }

    /// 调整人数
    pub fn change_headcount(&self, headcount: i64) -> ApiResult<HeadcountChangeView> {
        let mut wf = self.lock()?;
        let released = wf.change_headcount(headcount)?;
        Ok(HeadcountChangeView {
            released_assignments: released.len(),
            released_units_per_hour: released
                .iter()
                .map(|a| a.assigned_units_per_hour as u64)
                .sum(),
            board: Self::board(&wf)?,
        })
    }

    // ==========================================
    // 保存
    // ==========================================

    /// 保存当前会话
    ///
    /// # 返回
    /// - Ok(String): 会话ID
    /// - Err(ApiError): 保存失败时会话保持不变,可重试
    #[instrument(skip(self))]
    pub async fn save_session(&self) -> ApiResult<String> {
        let (pending, timeout) = {
            let wf = self.lock()?;
            let pending = wf.prepare_save()?;
            (pending, Duration::from_millis(wf.config().save_timeout_ms))
        };

        let session_id =
            BalancingWorkflow::persist(self.session_repo.as_ref(), &pending, timeout).await?;

        self.lock()?.complete_save(&pending, session_id.clone())?;
        Ok(session_id)
    }

    /// 已保存会话列表
    pub fn list_sessions(&self, product_id: Option<&str>) -> ApiResult<Vec<SessionSummary>> {
        Ok(self.session_repo.list_sessions(product_id)?)
    }

    /// 删除已保存会话
    pub fn delete_session(&self, session_id: &str) -> ApiResult<()> {
        Ok(self.session_repo.delete_session(session_id)?)
    }

    // ==========================================
    // 工序清单
    // ==========================================

    /// 从文件导入产品工序清单
    pub fn import_catalog(
        &self,
        file_path: &Path,
        product_id: &str,
        product_name: Option<&str>,
    ) -> ApiResult<ImportSummary> {
        if product_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("产品ID不能为空".to_string()));
        }
        Ok(self
            .importer
            .import_file(file_path, product_id.trim(), product_name)?)
    }

    pub fn list_products(&self) -> ApiResult<Vec<ProductSummary>> {
        Ok(self.catalog_repo.list_products()?)
    }

    // ==========================================
    // 看板组装
    // ==========================================

    fn board(wf: &BalancingWorkflow) -> ApiResult<BoardView> {
        let store = wf.store()?;
        let metrics = wf.metrics()?;

        let pool = store
            .operations()
            .iter()
            .zip(store.capacities())
            .map(|(op, cap)| PoolEntryView {
                operation_id: op.id.clone(),
                name: op.name.clone(),
                process_id: op.process_id.clone(),
                standard_time_minutes: op.standard_time_minutes,
                total_units_per_hour: cap.total_units_per_hour,
                assigned_units_per_hour: cap.assigned_units_per_hour,
                pending_units_per_hour: cap.pending_units_per_hour(),
                degraded: !op.is_producible(),
            })
            .collect();

        let operators = store
            .operators()
            .iter()
            .map(|operator| {
                let (occupied_minutes, occupancy_percentage) = metrics
                    .load_of(operator.operator_id)
                    .map(|l| (l.occupied_minutes, l.occupancy_percentage))
                    .unwrap_or((0.0, 0.0));
                OperatorView {
                    operator_id: operator.operator_id.0,
                    display_name: operator.display_name.clone(),
                    occupied_minutes,
                    occupancy_percentage,
                    assignments: operator
                        .assignments
                        .iter()
                        .map(|a| AssignmentView {
                            instance_id: a.instance_id.to_string(),
                            operation_id: a.operation_id.clone(),
                            operation_name: store
                                .operation(&a.operation_id)
                                .map(|op| op.name.clone())
                                .unwrap_or_default(),
                            assigned_units_per_hour: a.assigned_units_per_hour,
                        })
                        .collect(),
                }
            })
            .collect();

        Ok(BoardView {
            session_id: wf.session_id().map(str::to_string),
            product_id: store.product_id().to_string(),
            headcount: store.headcount(),
            revision: wf.revision(),
            unsaved_changes: wf.has_unsaved_changes(),
            total_standard_time: metrics.total_standard_time,
            units_per_hour: metrics.units_per_hour,
            takt_time: metrics.takt_time,
            required_machines: metrics.required_machines,
            unassigned_minutes: metrics.unassigned_minutes,
            pool,
            operators,
            summary: metrics.summary,
        })
    }
}

fn parse_instance_id(raw: &str) -> ApiResult<InstanceId> {
    Uuid::parse_str(raw.trim())
        .map(InstanceId)
        .map_err(|e| ApiError::InvalidInput(format!("分配实例ID格式错误: {} ({})", raw, e)))
}
