// ==========================================
// 生产线平衡引擎 - 分配交互控制器
// ==========================================
// 职责: 把用户意图（“把工序 X 以 Q 件/小时放到操作员 Y”）转换为状态存储调用
// 规则:
// 1) 数量 <= 0 在到达存储之前拒绝
// 2) 未指定数量时默认取该工序全部待分配产能
// 3) 移动 = unassign + assign,对调用方原子（要么都成功,要么状态不变）
// 4) 存储层不变量错误原样透传
// ==========================================

use crate::domain::operator::OperationAssignment;
use crate::domain::types::{InstanceId, OperatorId};
use crate::engine::balancing_store::{BalancingStore, QuantityChange};
use crate::engine::error::{BalancingError, BalancingResult};
use crate::engine::events::{BalancingEvent, OptionalEventPublisher};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 放置意图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementIntent {
    pub operation_id: String,
    pub operator_id: OperatorId,
    /// None 表示使用默认数量（全部待分配产能）
    pub requested_units: Option<i64>,
}

impl PlacementIntent {
    pub fn new(operation_id: impl Into<String>, operator_id: OperatorId) -> Self {
        Self {
            operation_id: operation_id.into(),
            operator_id,
            requested_units: None,
        }
    }

    pub fn with_units(mut self, units: i64) -> Self {
        self.requested_units = Some(units);
        self
    }
}

// ==========================================
// AssignmentController - 分配交互控制器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AssignmentController {
    publisher: OptionalEventPublisher,
}

impl AssignmentController {
    pub fn new(publisher: OptionalEventPublisher) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &OptionalEventPublisher {
        &self.publisher
    }

    /// 放置工序到操作员（恰好一次 assign 调用）
    #[instrument(skip(self, store), fields(product_id = %store.product_id()))]
    pub fn place(
        &self,
        store: &mut BalancingStore,
        intent: &PlacementIntent,
    ) -> BalancingResult<OperationAssignment> {
        let units = match intent.requested_units {
            Some(requested) => Self::validate_quantity(requested)?,
            None => Self::default_quantity(store, &intent.operation_id)?,
        };

        let assignment = store.assign(&intent.operation_id, intent.operator_id, units)?;
        self.publisher.publish(BalancingEvent::AssignmentCreated {
            assignment: assignment.clone(),
        });
        Ok(assignment)
    }

    /// 把已有分配从一个操作员移动到另一个操作员
    ///
    /// # 参数
    /// - `requested_units`: 目标数量（None 表示沿用原数量）
    ///
    /// # 返回
    /// 目标操作员名下的新分配实例
    #[instrument(skip(self, store), fields(product_id = %store.product_id()))]
    pub fn move_assignment(
        &self,
        store: &mut BalancingStore,
        from: OperatorId,
        instance_id: InstanceId,
        to: OperatorId,
        requested_units: Option<i64>,
    ) -> BalancingResult<OperationAssignment> {
        if from == to {
            return Err(BalancingError::InvalidIntent(format!(
                "源操作员与目标操作员相同: {}",
                from
            )));
        }
        if store.operator(to).is_none() {
            return Err(BalancingError::OperatorNotFound(to));
        }
        let requested = requested_units.map(Self::validate_quantity).transpose()?;

        let snapshot = store.clone();
        let result = store.unassign(from, instance_id).and_then(|removed| {
            let units = requested.unwrap_or(removed.assigned_units_per_hour);
            store
                .assign(&removed.operation_id, to, units)
                .map(|created| (removed, created))
        });

        match result {
            Ok((removed, created)) => {
                tracing::debug!(
                    operation_id = %created.operation_id,
                    from = %from,
                    to = %to,
                    units = created.assigned_units_per_hour,
                    "分配移动成功"
                );
                self.publisher
                    .publish(BalancingEvent::AssignmentRemoved { assignment: removed });
                self.publisher.publish(BalancingEvent::AssignmentCreated {
                    assignment: created.clone(),
                });
                Ok(created)
            }
            Err(e) => {
                *store = snapshot;
                tracing::info!("分配移动被拒绝,状态已回滚: {}", e);
                Err(e)
            }
        }
    }

    /// 修改分配数量
    pub fn resize_assignment(
        &self,
        store: &mut BalancingStore,
        operator_id: OperatorId,
        instance_id: InstanceId,
        new_units: i64,
    ) -> BalancingResult<QuantityChange> {
        let units = Self::validate_quantity(new_units)?;
        let change = store.reassign_quantity(operator_id, instance_id, units)?;

        if change.previous_units_per_hour != change.assignment.assigned_units_per_hour {
            self.publisher.publish(BalancingEvent::AssignmentResized {
                operator_id,
                instance_id,
                previous_units_per_hour: change.previous_units_per_hour,
                units_per_hour: change.assignment.assigned_units_per_hour,
            });
        }
        Ok(change)
    }

    /// 取消分配
    pub fn remove_assignment(
        &self,
        store: &mut BalancingStore,
        operator_id: OperatorId,
        instance_id: InstanceId,
    ) -> BalancingResult<OperationAssignment> {
        let removed = store.unassign(operator_id, instance_id)?;
        self.publisher.publish(BalancingEvent::AssignmentRemoved {
            assignment: removed.clone(),
        });
        Ok(removed)
    }

    /// 重命名操作员（名称去除首尾空白,不可为空）
    pub fn rename_operator(
        &self,
        store: &mut BalancingStore,
        operator_id: OperatorId,
        new_name: &str,
    ) -> BalancingResult<()> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(BalancingError::InvalidIntent("操作员名称不能为空".to_string()));
        }

        store.rename_operator(operator_id, name)?;
        self.publisher.publish(BalancingEvent::OperatorRenamed {
            operator_id,
            display_name: name.to_string(),
        });
        Ok(())
    }

    // ==========================================
    // 校验辅助
    // ==========================================

    /// 用户输入数量校验: <= 0 拒绝,超过 u32 上限按上限处理（存储层再钳制）
    pub fn validate_quantity(requested: i64) -> BalancingResult<u32> {
        if requested <= 0 {
            return Err(BalancingError::InvalidQuantity(requested));
        }
        Ok(u32::try_from(requested).unwrap_or(u32::MAX))
    }

    /// 默认数量 = 全部待分配产能
    pub fn default_quantity(store: &BalancingStore, operation_id: &str) -> BalancingResult<u32> {
        let capacity = store
            .capacity(operation_id)
            .ok_or_else(|| BalancingError::OperationNotFound(operation_id.to_string()))?;
        Ok(capacity.pending_units_per_hour().max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation::Operation;

    fn store() -> BalancingStore {
        let ops = vec![
            Operation::new("O1", "合缝", "SEW", 1.0),
            Operation::new("O2", "锁边", "SEW", 2.0),
        ];
        BalancingStore::initialize("P1", ops, 2, "Operator", None).unwrap()
    }

    #[test]
    fn test_validate_quantity() {
        assert_eq!(AssignmentController::validate_quantity(0), Err(BalancingError::InvalidQuantity(0)));
        assert_eq!(AssignmentController::validate_quantity(-5), Err(BalancingError::InvalidQuantity(-5)));
        assert_eq!(AssignmentController::validate_quantity(12), Ok(12));
        assert_eq!(AssignmentController::validate_quantity(i64::MAX), Ok(u32::MAX));
    }

    #[test]
    fn test_place_defaults_to_full_pending() {
        let controller = AssignmentController::default();
        let mut s = store();
        let a = controller
            .place(&mut s, &PlacementIntent::new("O2", OperatorId(1)))
            .unwrap();
        assert_eq!(a.assigned_units_per_hour, 30);
        assert_eq!(s.capacity("O2").unwrap().pending_units_per_hour(), 0);
    }

    #[test]
    fn test_place_declines_non_positive_before_store() {
        let controller = AssignmentController::default();
        let mut s = store();
        let err = controller
            .place(&mut s, &PlacementIntent::new("O1", OperatorId(1)).with_units(0))
            .unwrap_err();
        assert_eq!(err, BalancingError::InvalidQuantity(0));
        assert!(s.operators().iter().all(|o| o.assignments.is_empty()));
    }

    #[test]
    fn test_move_to_same_operator_is_declined() {
        let controller = AssignmentController::default();
        let mut s = store();
        let a = controller
            .place(&mut s, &PlacementIntent::new("O1", OperatorId(1)).with_units(10))
            .unwrap();
        let err = controller
            .move_assignment(&mut s, OperatorId(1), a.instance_id, OperatorId(1), None)
            .unwrap_err();
        assert!(matches!(err, BalancingError::InvalidIntent(_)));
    }

    #[test]
    fn test_rename_rejects_blank() {
        let controller = AssignmentController::default();
        let mut s = store();
        assert!(controller.rename_operator(&mut s, OperatorId(1), "   ").is_err());
        controller.rename_operator(&mut s, OperatorId(1), " 张三 ").unwrap();
        assert_eq!(s.operators()[0].display_name, "张三");
    }
}
