// ==========================================
// 生产线平衡引擎 - 平衡流程编排
// ==========================================
// 职责:
// 1) 产品选择 / 已保存会话加载 → 初始化状态存储
// 2) 人数调整、数量对话框默认值
// 3) 会话阶段管理 (Uninitialized → Active → Discarded)
// 4) 保存协议: 快照 → 网关 → 记录已保存修订号
// ==========================================
// 红线: 保存失败时内存会话保持不变;
// 内存与持久化状态只允许在“未保存修改”方向上不一致
// ==========================================

use crate::config::balancing_config::BalancingConfig;
use crate::domain::operator::OperationAssignment;
use crate::domain::session::{AssignmentRecord, OperatorRecord, SessionHeader, SessionSnapshot};
use crate::domain::types::{InstanceId, OperatorId, SessionPhase};
use crate::engine::balancing_store::{BalancingStore, QuantityChange};
use crate::engine::calculator::{BalancingCalculator, BalancingMetrics};
use crate::engine::error::{BalancingError, BalancingResult, GatewayError};
use crate::engine::events::{BalancingEvent, BalancingEventPublisher, OptionalEventPublisher};
use crate::engine::gateway::{OperationCatalog, PersistenceGateway, SavedSessionLoader};
use crate::engine::interaction::{AssignmentController, PlacementIntent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// 数量对话框参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityDialog {
    pub operation_id: String,
    pub min_units: u32,
    pub max_units: u32,
    pub default_units: u32,
}

/// 待完成的保存（快照 + 快照时的修订号）
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub session_id: Option<String>,
    /// 会话代次（替换/放弃会话时递增）
    pub epoch: u64,
    pub revision: u64,
    pub snapshot: SessionSnapshot,
}

// ==========================================
// BalancingWorkflow - 平衡流程编排
// ==========================================
pub struct BalancingWorkflow {
    config: BalancingConfig,
    controller: AssignmentController,
    calculator: BalancingCalculator,
    phase: SessionPhase,
    store: Option<BalancingStore>,
    session_id: Option<String>,
    epoch: u64,
    revision: u64,
    saved_revision: Option<u64>,
}

impl BalancingWorkflow {
    /// 创建流程实例
    ///
    /// # 参数
    /// - `config`: 平衡配置
    /// - `event_publisher`: 事件发布器（可选）
    pub fn new(
        config: BalancingConfig,
        event_publisher: Option<Arc<dyn BalancingEventPublisher>>,
    ) -> Self {
        let publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            config,
            controller: AssignmentController::new(publisher),
            calculator: BalancingCalculator::new(),
            phase: SessionPhase::Uninitialized,
            store: None,
            session_id: None,
            epoch: 0,
            revision: 0,
            saved_revision: None,
        }
    }

    // ==========================================
    // 会话创建
    // ==========================================

    /// 选择产品并创建新会话
    ///
    /// # 参数
    /// - `headcount`: 人数（None 使用配置默认值）
    ///
    /// # 错误
    /// - `NoOperationListFound`: 产品无工序清单
    /// - `InvalidProductState`: 工序清单为空/无效
    #[instrument(skip(self, catalog))]
    pub fn select_product(
        &mut self,
        catalog: &dyn OperationCatalog,
        product_id: &str,
        headcount: Option<u32>,
    ) -> BalancingResult<()> {
        let headcount = headcount.unwrap_or(self.config.default_headcount);
        let operations = Self::load_operations(catalog, product_id)?;

        let store = BalancingStore::initialize(
            product_id,
            operations,
            headcount,
            &self.config.operator_name_prefix,
            None,
        )?;

        self.activate(store, None);
        Ok(())
    }

    /// 加载已保存会话（编辑模式）
    #[instrument(skip(self, catalog, loader))]
    pub fn open_saved(
        &mut self,
        catalog: &dyn OperationCatalog,
        loader: &dyn SavedSessionLoader,
        session_id: &str,
    ) -> BalancingResult<()> {
        let saved = loader.get_saved_assignments(session_id).map_err(|e| match e {
            GatewayError::NotFound { .. } => {
                BalancingError::InvalidSavedSession(format!("会话不存在: {}", session_id))
            }
            other => BalancingError::InvalidSavedSession(other.to_string()),
        })?;

        let operations = Self::load_operations(catalog, &saved.product_id)?;
        let store = BalancingStore::initialize(
            &saved.product_id,
            operations,
            saved.headcount,
            &self.config.operator_name_prefix,
            Some(&saved),
        )?;

        self.activate(store, Some(saved.session_id.clone()));
        Ok(())
    }

    fn load_operations(
        catalog: &dyn OperationCatalog,
        product_id: &str,
    ) -> BalancingResult<Vec<crate::domain::operation::Operation>> {
        catalog
            .get_operations_for_product(product_id)
            .map_err(|e| match e {
                GatewayError::NotFound { .. } => BalancingError::NoOperationListFound {
                    product_id: product_id.to_string(),
                },
                other => BalancingError::InvalidProductState {
                    product_id: product_id.to_string(),
                    reason: format!("工序清单读取失败: {}", other),
                },
            })
    }

    fn activate(&mut self, store: BalancingStore, session_id: Option<String>) {
        if self.phase == SessionPhase::Active {
            tracing::info!(
                previous_product = ?self.store.as_ref().map(|s| s.product_id().to_string()),
                "替换当前会话"
            );
        }

        let event = BalancingEvent::SessionInitialized {
            product_id: store.product_id().to_string(),
            headcount: store.headcount(),
        };

        self.saved_revision = session_id.as_ref().map(|_| 0);
        self.session_id = session_id;
        self.epoch += 1;
        self.revision = 0;
        self.store = Some(store);
        self.phase = SessionPhase::Active;
        self.controller.publisher().publish(event);
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn config(&self) -> &BalancingConfig {
        &self.config
    }

    /// 当前修订号（每次成功变更 +1）
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn store(&self) -> BalancingResult<&BalancingStore> {
        match (&self.phase, &self.store) {
            (SessionPhase::Active, Some(store)) => Ok(store),
            _ => Err(BalancingError::SessionNotActive(self.phase)),
        }
    }

    fn store_mut(&mut self) -> BalancingResult<&mut BalancingStore> {
        match (&self.phase, &mut self.store) {
            (SessionPhase::Active, Some(store)) => Ok(store),
            _ => Err(BalancingError::SessionNotActive(self.phase)),
        }
    }

    /// 重新计算全部指标
    pub fn metrics(&self) -> BalancingResult<BalancingMetrics> {
        let store = self.store()?;
        Ok(self.calculator.compute(store))
    }

    /// 是否存在未保存修改
    pub fn has_unsaved_changes(&self) -> bool {
        self.phase == SessionPhase::Active && self.saved_revision != Some(self.revision)
    }

    /// 数量对话框: 范围 [1, pending],默认 pending
    pub fn quantity_dialog(&self, operation_id: &str) -> BalancingResult<QuantityDialog> {
        let store = self.store()?;
        let capacity = store
            .capacity(operation_id)
            .ok_or_else(|| BalancingError::OperationNotFound(operation_id.to_string()))?;

        if capacity.total_units_per_hour == 0 {
            return Err(BalancingError::DegradedOperationData {
                operation_ids: vec![operation_id.to_string()],
            });
        }

        let pending = capacity.pending_units_per_hour();
        if pending == 0 {
            return Err(BalancingError::NoCapacityRemaining {
                operation_id: operation_id.to_string(),
            });
        }

        Ok(QuantityDialog {
            operation_id: operation_id.to_string(),
            min_units: 1,
            max_units: pending,
            default_units: pending,
        })
    }

    // ==========================================
    // 变更操作
    // ==========================================

    /// 调整人数
    ///
    /// # 返回
    /// 被强制取消的分配（已折回待分配产能）
    pub fn change_headcount(&mut self, new_count: i64) -> BalancingResult<Vec<OperationAssignment>> {
        let count = u32::try_from(new_count)
            .ok()
            .filter(|c| *c > 0)
            .ok_or(BalancingError::InvalidHeadcount(new_count))?;

        let store = self.store_mut()?;
        let previous = store.headcount();
        let released = store.resize_headcount(count)?;
        let current = store.headcount();

        if previous != current {
            self.revision += 1;
            self.controller.publisher().publish(BalancingEvent::HeadcountChanged {
                previous,
                current,
                released: released.clone(),
            });
        }
        Ok(released)
    }

    pub fn place(&mut self, intent: &PlacementIntent) -> BalancingResult<OperationAssignment> {
        let controller = self.controller.clone();
        let result = controller.place(self.store_mut()?, intent);
        self.bump_on_success(result)
    }

    pub fn move_assignment(
        &mut self,
        from: OperatorId,
        instance_id: InstanceId,
        to: OperatorId,
        requested_units: Option<i64>,
    ) -> BalancingResult<OperationAssignment> {
        let controller = self.controller.clone();
        let result =
            controller.move_assignment(self.store_mut()?, from, instance_id, to, requested_units);
        self.bump_on_success(result)
    }

    pub fn resize_assignment(
        &mut self,
        operator_id: OperatorId,
        instance_id: InstanceId,
        new_units: i64,
    ) -> BalancingResult<QuantityChange> {
        let controller = self.controller.clone();
        let result =
            controller.resize_assignment(self.store_mut()?, operator_id, instance_id, new_units);
        self.bump_on_success(result)
    }

    pub fn remove_assignment(
        &mut self,
        operator_id: OperatorId,
        instance_id: InstanceId,
    ) -> BalancingResult<OperationAssignment> {
        let controller = self.controller.clone();
        let result = controller.remove_assignment(self.store_mut()?, operator_id, instance_id);
        self.bump_on_success(result)
    }

    pub fn rename_operator(&mut self, operator_id: OperatorId, new_name: &str) -> BalancingResult<()> {
        let controller = self.controller.clone();
        let result = controller.rename_operator(self.store_mut()?, operator_id, new_name);
        self.bump_on_success(result)
    }

    fn bump_on_success<T>(&mut self, result: BalancingResult<T>) -> BalancingResult<T> {
        if result.is_ok() {
            self.revision += 1;
        }
        result
    }

    /// 放弃会话
    pub fn discard(&mut self) -> BalancingResult<()> {
        let store = self.store()?;
        let product_id = store.product_id().to_string();

        self.store = None;
        self.session_id = None;
        self.saved_revision = None;
        self.epoch += 1;
        self.phase = SessionPhase::Discarded;

        tracing::info!(product_id = %product_id, "平衡会话已放弃");
        self.controller
            .publisher()
            .publish(BalancingEvent::SessionDiscarded { product_id });
        Ok(())
    }

    // ==========================================
    // 保存
    // ==========================================

    /// 生成保存快照（不修改会话）
    ///
    /// # 错误
    /// - `InvariantViolation`: 状态不变量被破坏
    /// - `DegradedOperationData`: 存在无产能工序且配置要求阻止保存
    pub fn prepare_save(&self) -> BalancingResult<PendingSave> {
        let store = self.store()?;
        store.check_invariants()?;

        let metrics = self.calculator.compute(store);
        if self.config.block_save_on_degraded_data && metrics.has_degraded_data() {
            return Err(BalancingError::DegradedOperationData {
                operation_ids: metrics.degraded_operations.clone(),
            });
        }

        Ok(PendingSave {
            session_id: self.session_id.clone(),
            epoch: self.epoch,
            revision: self.revision,
            snapshot: Self::build_snapshot(store, &metrics),
        })
    }

    /// 记录保存成功
    ///
    /// 保存期间若有新变更,会话仍保持“未保存”状态
    pub fn complete_save(&mut self, pending: &PendingSave, session_id: String) -> BalancingResult<()> {
        self.store()?;
        if pending.epoch != self.epoch {
            tracing::warn!(session_id = %session_id, "保存期间会话已被替换,不记录保存状态");
            return Err(BalancingError::InvalidIntent(
                "保存期间会话已被替换".to_string(),
            ));
        }

        self.session_id = Some(session_id.clone());
        self.saved_revision = Some(pending.revision);

        tracing::info!(
            session_id = %session_id,
            revision = pending.revision,
            unsaved = self.has_unsaved_changes(),
            "平衡会话已保存"
        );
        self.controller
            .publisher()
            .publish(BalancingEvent::SessionSaved { session_id });
        Ok(())
    }

    /// 保存会话（带超时）
    ///
    /// 失败时内存会话保持不变,可重试
    pub async fn save(&mut self, gateway: &dyn PersistenceGateway) -> BalancingResult<String> {
        let pending = self.prepare_save()?;
        let timeout = Duration::from_millis(self.config.save_timeout_ms);

        let session_id = Self::persist(gateway, &pending, timeout).await?;
        self.complete_save(&pending, session_id.clone())?;
        Ok(session_id)
    }

    /// 调用持久化网关,错误统一转换为 `PersistenceFailure`
    pub async fn persist(
        gateway: &dyn PersistenceGateway,
        pending: &PendingSave,
        timeout: Duration,
    ) -> BalancingResult<String> {
        let call = gateway.save_session(pending.session_id.as_deref(), &pending.snapshot);
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(session_id)) => Ok(session_id),
            Ok(Err(e)) => {
                tracing::error!("会话保存失败: {}", e);
                Err(BalancingError::PersistenceFailure(e.to_string()))
            }
            Err(_) => {
                tracing::error!("会话保存超时: {:?}", timeout);
                Err(BalancingError::PersistenceFailure(format!(
                    "保存超时 ({} ms)",
                    timeout.as_millis()
                )))
            }
        }
    }

    fn build_snapshot(store: &BalancingStore, metrics: &BalancingMetrics) -> SessionSnapshot {
        let header = SessionHeader {
            product_id: store.product_id().to_string(),
            headcount: store.headcount(),
            total_standard_time: metrics.total_standard_time,
            units_per_hour: metrics.units_per_hour,
            takt_time: metrics.takt_time,
            required_machines: metrics.required_machines,
        };

        let operators = store
            .operators()
            .iter()
            .map(|operator| {
                let (occupied_minutes, occupancy_percentage) = metrics
                    .load_of(operator.operator_id)
                    .map(|l| (l.occupied_minutes, l.occupancy_percentage))
                    .unwrap_or((0.0, 0.0));
                OperatorRecord {
                    operator_id: operator.operator_id,
                    display_name: operator.display_name.clone(),
                    occupied_minutes,
                    occupancy_percentage,
                    assignments: operator
                        .assignments
                        .iter()
                        .map(|a| AssignmentRecord {
                            operation_id: a.operation_id.clone(),
                            assigned_units_per_hour: a.assigned_units_per_hour,
                        })
                        .collect(),
                }
            })
            .collect();

        SessionSnapshot { header, operators }
    }
}
