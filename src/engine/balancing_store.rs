// ==========================================
// 生产线平衡引擎 - 平衡状态存储
// ==========================================
// 职责: 持有平衡会话的规范内存模型,并在每次变更时保证不变量
// 结构: 工序产能池 与 操作员槽位数组 是两个独立集合,仅以 ID 关联
// 红线:
// 1) 0 <= assigned_units_per_hour <= total_units_per_hour
// 2) 每个工序: Σ(分配实例.assigned_units_per_hour) == 产能池.assigned_units_per_hour
// 3) 被拒绝的变更不得修改任何状态
// ==========================================

use crate::domain::operation::{Operation, OperationCapacity};
use crate::domain::operator::{OperationAssignment, Operator};
use crate::domain::session::SavedSession;
use crate::domain::types::{InstanceId, OperatorId};
use crate::engine::error::{BalancingError, BalancingResult};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// 数量修改结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityChange {
    pub assignment: OperationAssignment,
    pub previous_units_per_hour: u32,
}

// ==========================================
// BalancingStore - 平衡状态存储
// ==========================================
#[derive(Debug, Clone)]
pub struct BalancingStore {
    product_id: String,
    operations: Vec<Operation>,
    capacities: Vec<OperationCapacity>, // 与 operations 同序
    operation_index: HashMap<String, usize>,
    operators: Vec<Operator>,
    next_operator_id: u32,
    operator_name_prefix: String,
}

impl BalancingStore {
    // ==========================================
    // 初始化
    // ==========================================

    /// 初始化平衡会话
    ///
    /// # 参数
    /// - `product_id`: 产品ID
    /// - `operations`: 产品工序清单（有序）
    /// - `headcount`: 操作员人数
    /// - `operator_name_prefix`: 默认操作员名称前缀
    /// - `existing`: 已保存会话（编辑模式,按记录回放）
    ///
    /// # 错误
    /// - `InvalidProductState`: 工序清单为空或工序编号重复
    /// - `InvalidHeadcount`: 人数为 0
    /// - `InvalidSavedSession`: 回放记录引用未知工序/操作员、数量非正或超出产能
    ///
    /// 小时产能为 0 的工序（SAM 非正或过大）保留在产能池中,由 `degraded_operations` 报告
    #[instrument(skip(operations, existing), fields(
        operations_count = operations.len(),
        replay = existing.is_some()
    ))]
    pub fn initialize(
        product_id: &str,
        operations: Vec<Operation>,
        headcount: u32,
        operator_name_prefix: &str,
        existing: Option<&SavedSession>,
    ) -> BalancingResult<Self> {
        if operations.is_empty() {
            return Err(BalancingError::InvalidProductState {
                product_id: product_id.to_string(),
                reason: "工序清单为空".to_string(),
            });
        }
        if headcount == 0 {
            return Err(BalancingError::InvalidHeadcount(0));
        }

        let mut operation_index = HashMap::with_capacity(operations.len());
        for (idx, op) in operations.iter().enumerate() {
            if operation_index.insert(op.id.clone(), idx).is_some() {
                return Err(BalancingError::InvalidProductState {
                    product_id: product_id.to_string(),
                    reason: format!("工序编号重复: {}", op.id),
                });
            }
        }

        let capacities = operations
            .iter()
            .map(OperationCapacity::for_operation)
            .collect();

        let mut store = Self {
            product_id: product_id.to_string(),
            operations,
            capacities,
            operation_index,
            operators: Vec::with_capacity(headcount as usize),
            next_operator_id: 1,
            operator_name_prefix: operator_name_prefix.to_string(),
        };

        match existing {
            Some(saved) => store.replay(saved, headcount)?,
            None => store.append_empty_slots(headcount as usize),
        }

        let degraded = store.degraded_operations();
        if !degraded.is_empty() {
            tracing::warn!(
                product_id = %store.product_id,
                degraded = ?degraded,
                "工序小时产能为 0,按零产能保留"
            );
        }

        tracing::info!(
            product_id = %store.product_id,
            headcount = store.headcount(),
            "平衡会话初始化完成"
        );
        Ok(store)
    }

    /// 回放已保存的操作员与分配记录
    fn replay(&mut self, saved: &SavedSession, headcount: u32) -> BalancingResult<()> {
        if saved.operators.len() > headcount as usize {
            return Err(BalancingError::InvalidSavedSession(format!(
                "操作员记录数 {} 超过人数 {}",
                saved.operators.len(),
                headcount
            )));
        }

        let mut seen = HashSet::new();
        for saved_op in &saved.operators {
            if !seen.insert(saved_op.operator_id) {
                return Err(BalancingError::InvalidSavedSession(format!(
                    "操作员ID重复: {}",
                    saved_op.operator_id
                )));
            }
            self.operators
                .push(Operator::empty(saved_op.operator_id, saved_op.display_name.clone()));
            self.next_operator_id = self.next_operator_id.max(saved_op.operator_id.0 + 1);
        }

        // 人数多于已保存操作员时补齐空槽位
        let missing = headcount as usize - self.operators.len();
        self.append_empty_slots(missing);

        for (row, record) in saved.assignments.iter().enumerate() {
            if record.assigned_units_per_hour == 0 {
                return Err(BalancingError::InvalidSavedSession(format!(
                    "第 {} 条分配数量为 0",
                    row + 1
                )));
            }
            let op_idx = self.operation_position(&record.operation_id).map_err(|_| {
                BalancingError::InvalidSavedSession(format!(
                    "第 {} 条分配引用未知工序 {}",
                    row + 1,
                    record.operation_id
                ))
            })?;
            let slot = self.operator_position(record.operator_id).map_err(|_| {
                BalancingError::InvalidSavedSession(format!(
                    "第 {} 条分配引用未知操作员 {}",
                    row + 1,
                    record.operator_id
                ))
            })?;

            let pending = self.capacities[op_idx].pending_units_per_hour();
            if record.assigned_units_per_hour > pending {
                return Err(BalancingError::InvalidSavedSession(format!(
                    "工序 {} 回放数量 {} 超出剩余产能 {}",
                    record.operation_id, record.assigned_units_per_hour, pending
                )));
            }

            self.capacities[op_idx].assigned_units_per_hour += record.assigned_units_per_hour;
            self.operators[slot].assignments.push(OperationAssignment {
                instance_id: InstanceId::generate(),
                operation_id: record.operation_id.clone(),
                operator_id: record.operator_id,
                assigned_units_per_hour: record.assigned_units_per_hour,
            });
        }

        tracing::debug!(
            session_id = %saved.session_id,
            assignments = saved.assignments.len(),
            "已保存分配回放完成"
        );
        Ok(())
    }

    fn append_empty_slots(&mut self, count: usize) {
        for _ in 0..count {
            let position = self.operators.len() + 1;
            let operator_id = OperatorId(self.next_operator_id);
            self.next_operator_id += 1;
            self.operators.push(Operator::empty(
                operator_id,
                Operator::default_name(&self.operator_name_prefix, position),
            ));
        }
    }

    // ==========================================
    // 变更操作
    // ==========================================

    /// 调整人数
    ///
    /// 保留前 min(旧, 新) 个槽位（名称与分配不变）,新增槽位为空,
    /// 被移除槽位的分配全部折回待分配产能。
    ///
    /// # 返回
    /// 被强制取消的分配实例（供调用方通知）
    #[instrument(skip(self), fields(product_id = %self.product_id, old = self.operators.len()))]
    pub fn resize_headcount(&mut self, new_count: u32) -> BalancingResult<Vec<OperationAssignment>> {
        if new_count == 0 {
            return Err(BalancingError::InvalidHeadcount(0));
        }

        let new_len = new_count as usize;
        let mut released = Vec::new();

        if new_len < self.operators.len() {
            let removed: Vec<Operator> = self.operators.drain(new_len..).collect();
            for operator in removed {
                for assignment in operator.assignments {
                    if let Some(&idx) = self.operation_index.get(&assignment.operation_id) {
                        let capacity = &mut self.capacities[idx];
                        capacity.assigned_units_per_hour = capacity
                            .assigned_units_per_hour
                            .saturating_sub(assignment.assigned_units_per_hour);
                    }
                    released.push(assignment);
                }
            }
        } else {
            self.append_empty_slots(new_len - self.operators.len());
        }

        tracing::info!(
            headcount = self.operators.len(),
            released = released.len(),
            "人数调整完成"
        );
        Ok(released)
    }

    /// 分配工序到操作员
    ///
    /// 请求数量钳制到 [1, pending]。pending 为 0 时返回 `NoCapacityRemaining` 且不修改状态;
    /// 工序本身无产能（降级数据）时返回 `DegradedOperationData`。
    pub fn assign(
        &mut self,
        operation_id: &str,
        operator_id: OperatorId,
        requested_units_per_hour: u32,
    ) -> BalancingResult<OperationAssignment> {
        let slot = self.operator_position(operator_id)?;
        let op_idx = self.operation_position(operation_id)?;

        if !self.operations[op_idx].is_producible() {
            return Err(BalancingError::DegradedOperationData {
                operation_ids: vec![operation_id.to_string()],
            });
        }

        let pending = self.capacities[op_idx].pending_units_per_hour();
        if pending == 0 {
            return Err(BalancingError::NoCapacityRemaining {
                operation_id: operation_id.to_string(),
            });
        }

        let units = requested_units_per_hour.clamp(1, pending);
        if units != requested_units_per_hour {
            tracing::debug!(
                operation_id,
                requested = requested_units_per_hour,
                clamped = units,
                "分配数量已钳制"
            );
        }

        let assignment = OperationAssignment {
            instance_id: InstanceId::generate(),
            operation_id: operation_id.to_string(),
            operator_id,
            assigned_units_per_hour: units,
        };

        self.capacities[op_idx].assigned_units_per_hour += units;
        self.operators[slot].assignments.push(assignment.clone());

        tracing::debug!(
            operation_id,
            operator = %operator_id,
            units,
            pending = self.capacities[op_idx].pending_units_per_hour(),
            "分配成功"
        );
        Ok(assignment)
    }

    /// 取消分配,数量折回待分配产能
    pub fn unassign(
        &mut self,
        operator_id: OperatorId,
        instance_id: InstanceId,
    ) -> BalancingResult<OperationAssignment> {
        let slot = self.operator_position(operator_id)?;
        let pos = self.operators[slot]
            .assignments
            .iter()
            .position(|a| a.instance_id == instance_id)
            .ok_or(BalancingError::AssignmentNotFound {
                operator_id,
                instance_id,
            })?;

        let op_idx = self.operation_position(&self.operators[slot].assignments[pos].operation_id)?;
        let assignment = self.operators[slot].assignments.remove(pos);

        let capacity = &mut self.capacities[op_idx];
        capacity.assigned_units_per_hour = capacity
            .assigned_units_per_hour
            .saturating_sub(assignment.assigned_units_per_hour);

        tracing::debug!(
            operation_id = %assignment.operation_id,
            operator = %operator_id,
            units = assignment.assigned_units_per_hour,
            "取消分配成功"
        );
        Ok(assignment)
    }

    /// 修改分配数量
    ///
    /// delta = new - old; pending - delta < 0 时返回 `CapacityExceeded`
    pub fn reassign_quantity(
        &mut self,
        operator_id: OperatorId,
        instance_id: InstanceId,
        new_units_per_hour: u32,
    ) -> BalancingResult<QuantityChange> {
        if new_units_per_hour == 0 {
            return Err(BalancingError::InvalidQuantity(0));
        }

        let slot = self.operator_position(operator_id)?;
        let (operation_id, previous) = self.operators[slot]
            .find_assignment(instance_id)
            .map(|a| (a.operation_id.clone(), a.assigned_units_per_hour))
            .ok_or(BalancingError::AssignmentNotFound {
                operator_id,
                instance_id,
            })?;
        let op_idx = self.operation_position(&operation_id)?;

        let capacity = &mut self.capacities[op_idx];
        if new_units_per_hour > previous {
            let delta = new_units_per_hour - previous;
            let pending = capacity.pending_units_per_hour();
            if delta > pending {
                return Err(BalancingError::CapacityExceeded {
                    operation_id,
                    requested_delta: delta,
                    pending,
                });
            }
            capacity.assigned_units_per_hour += delta;
        } else {
            capacity.assigned_units_per_hour -= previous - new_units_per_hour;
        }

        let assignment = self.operators[slot]
            .find_assignment_mut(instance_id)
            .ok_or(BalancingError::AssignmentNotFound {
                operator_id,
                instance_id,
            })?;
        assignment.assigned_units_per_hour = new_units_per_hour;

        Ok(QuantityChange {
            assignment: assignment.clone(),
            previous_units_per_hour: previous,
        })
    }

    /// 修改操作员显示名称
    ///
    /// # 返回
    /// 修改前的名称
    pub fn rename_operator(
        &mut self,
        operator_id: OperatorId,
        new_name: &str,
    ) -> BalancingResult<String> {
        let slot = self.operator_position(operator_id)?;
        let previous = std::mem::replace(
            &mut self.operators[slot].display_name,
            new_name.to_string(),
        );
        Ok(previous)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn capacities(&self) -> &[OperationCapacity] {
        &self.capacities
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn headcount(&self) -> u32 {
        self.operators.len() as u32
    }

    pub fn operator_name_prefix(&self) -> &str {
        &self.operator_name_prefix
    }

    pub fn operation(&self, operation_id: &str) -> Option<&Operation> {
        self.operation_index
            .get(operation_id)
            .map(|&idx| &self.operations[idx])
    }

    pub fn capacity(&self, operation_id: &str) -> Option<&OperationCapacity> {
        self.operation_index
            .get(operation_id)
            .map(|&idx| &self.capacities[idx])
    }

    pub fn operator(&self, operator_id: OperatorId) -> Option<&Operator> {
        self.operators.iter().find(|o| o.operator_id == operator_id)
    }

    /// 跨操作员查找分配实例
    pub fn find_assignment(&self, instance_id: InstanceId) -> Option<&OperationAssignment> {
        self.operators
            .iter()
            .find_map(|o| o.find_assignment(instance_id))
    }

    /// 某工序的全部分配实例
    pub fn assignments_for_operation<'a>(
        &'a self,
        operation_id: &'a str,
    ) -> impl Iterator<Item = &'a OperationAssignment> + 'a {
        self.operators
            .iter()
            .flat_map(|o| o.assignments.iter())
            .filter(move |a| a.operation_id == operation_id)
    }

    /// 小时产能为 0 的工序ID（降级数据）
    pub fn degraded_operations(&self) -> Vec<String> {
        self.operations
            .iter()
            .filter(|op| !op.is_producible())
            .map(|op| op.id.clone())
            .collect()
    }

    /// 全会话已分配 UPH 合计
    pub fn total_assigned_units(&self) -> u64 {
        self.capacities
            .iter()
            .map(|c| c.assigned_units_per_hour as u64)
            .sum()
    }

    /// 以求和方式校验全部不变量
    pub fn check_invariants(&self) -> BalancingResult<()> {
        let mut per_operation: HashMap<&str, u64> = HashMap::new();

        for operator in &self.operators {
            for assignment in &operator.assignments {
                if assignment.operator_id != operator.operator_id {
                    return Err(BalancingError::InvariantViolation(format!(
                        "分配 {} 归属 {} 但位于 {} 名下",
                        assignment.instance_id, assignment.operator_id, operator.operator_id
                    )));
                }
                if assignment.assigned_units_per_hour == 0 {
                    return Err(BalancingError::InvariantViolation(format!(
                        "分配 {} 数量为 0",
                        assignment.instance_id
                    )));
                }
                if !self.operation_index.contains_key(&assignment.operation_id) {
                    return Err(BalancingError::InvariantViolation(format!(
                        "分配 {} 引用未知工序 {}",
                        assignment.instance_id, assignment.operation_id
                    )));
                }
                *per_operation
                    .entry(assignment.operation_id.as_str())
                    .or_insert(0) += assignment.assigned_units_per_hour as u64;
            }
        }

        for capacity in &self.capacities {
            if capacity.assigned_units_per_hour > capacity.total_units_per_hour {
                return Err(BalancingError::InvariantViolation(format!(
                    "工序 {} 已分配 {} 超过总产能 {}",
                    capacity.operation_id,
                    capacity.assigned_units_per_hour,
                    capacity.total_units_per_hour
                )));
            }
            let summed = per_operation
                .get(capacity.operation_id.as_str())
                .copied()
                .unwrap_or(0);
            if summed != capacity.assigned_units_per_hour as u64 {
                return Err(BalancingError::InvariantViolation(format!(
                    "工序 {} 分配实例合计 {} 与产能池 {} 不一致",
                    capacity.operation_id, summed, capacity.assigned_units_per_hour
                )));
            }
        }

        Ok(())
    }

    // ==========================================
    // 内部查找
    // ==========================================

    fn operator_position(&self, operator_id: OperatorId) -> BalancingResult<usize> {
        self.operators
            .iter()
            .position(|o| o.operator_id == operator_id)
            .ok_or(BalancingError::OperatorNotFound(operator_id))
    }

    fn operation_position(&self, operation_id: &str) -> BalancingResult<usize> {
        self.operation_index
            .get(operation_id)
            .copied()
            .ok_or_else(|| BalancingError::OperationNotFound(operation_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{SavedAssignment, SavedOperator};

    fn ops() -> Vec<Operation> {
        vec![
            Operation::new("O1", "合缝", "SEW", 1.0),
            Operation::new("O2", "锁边", "SEW", 0.5),
        ]
    }

    fn store(headcount: u32) -> BalancingStore {
        BalancingStore::initialize("P1", ops(), headcount, "Operator", None).unwrap()
    }

    #[test]
    fn test_initialize_builds_pool_and_slots() {
        let s = store(3);
        assert_eq!(s.headcount(), 3);
        assert_eq!(s.capacities().len(), 2);
        assert_eq!(s.capacity("O1").unwrap().total_units_per_hour, 60);
        assert_eq!(s.capacity("O2").unwrap().total_units_per_hour, 120);
        assert_eq!(s.operators()[2].display_name, "Operator 3");
        assert_eq!(s.operators()[2].operator_id, OperatorId(3));
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_initialize_rejects_empty_and_duplicates() {
        let err = BalancingStore::initialize("P1", vec![], 2, "Operator", None).unwrap_err();
        assert!(matches!(err, BalancingError::InvalidProductState { .. }));

        let dup = vec![
            Operation::new("O1", "合缝", "SEW", 1.0),
            Operation::new("O1", "合缝", "SEW", 1.0),
        ];
        let err = BalancingStore::initialize("P1", dup, 2, "Operator", None).unwrap_err();
        assert!(matches!(err, BalancingError::InvalidProductState { .. }));

        let err = BalancingStore::initialize("P1", ops(), 0, "Operator", None).unwrap_err();
        assert_eq!(err, BalancingError::InvalidHeadcount(0));
    }

    #[test]
    fn test_degraded_operation_is_visible_with_zero_capacity() {
        let list = vec![
            Operation::new("O1", "合缝", "SEW", 1.0),
            Operation::new("O9", "检验", "QC", 0.0),
        ];
        let mut s = BalancingStore::initialize("P1", list, 1, "Operator", None).unwrap();
        assert_eq!(s.degraded_operations(), vec!["O9".to_string()]);
        assert_eq!(s.capacity("O9").unwrap().total_units_per_hour, 0);

        let err = s.assign("O9", OperatorId(1), 10).unwrap_err();
        assert_eq!(
            err,
            BalancingError::DegradedOperationData {
                operation_ids: vec!["O9".to_string()]
            }
        );
    }

    #[test]
    fn test_assign_clamps_to_pending_and_minimum() {
        let mut s = store(2);
        let a = s.assign("O1", OperatorId(1), 100).unwrap();
        assert_eq!(a.assigned_units_per_hour, 60);
        assert_eq!(s.capacity("O1").unwrap().pending_units_per_hour(), 0);

        let b = s.assign("O2", OperatorId(2), 0).unwrap();
        assert_eq!(b.assigned_units_per_hour, 1);
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_failed_assign_does_not_mutate() {
        let mut s = store(1);
        s.assign("O1", OperatorId(1), 60).unwrap();
        let before = s.clone();

        assert!(s.assign("O1", OperatorId(1), 1).is_err());
        assert!(matches!(
            s.assign("O2", OperatorId(9), 1),
            Err(BalancingError::OperatorNotFound(_))
        ));
        assert!(matches!(
            s.assign("NOPE", OperatorId(1), 1),
            Err(BalancingError::OperationNotFound(_))
        ));

        assert_eq!(s.capacities(), before.capacities());
        assert_eq!(s.operators(), before.operators());
    }

    #[test]
    fn test_reassign_quantity_delta_rules() {
        let mut s = store(2);
        let a = s.assign("O1", OperatorId(1), 30).unwrap();
        s.assign("O1", OperatorId(2), 20).unwrap();

        // pending = 10, +15 超出
        let err = s
            .reassign_quantity(OperatorId(1), a.instance_id, 45)
            .unwrap_err();
        assert!(matches!(err, BalancingError::CapacityExceeded { pending: 10, .. }));
        assert_eq!(s.capacity("O1").unwrap().assigned_units_per_hour, 50);

        let change = s.reassign_quantity(OperatorId(1), a.instance_id, 40).unwrap();
        assert_eq!(change.previous_units_per_hour, 30);
        assert_eq!(change.assignment.instance_id, a.instance_id);
        assert_eq!(s.capacity("O1").unwrap().pending_units_per_hour(), 0);

        s.reassign_quantity(OperatorId(1), a.instance_id, 5).unwrap();
        assert_eq!(s.capacity("O1").unwrap().pending_units_per_hour(), 35);
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_unassign_unknown_instance() {
        let mut s = store(1);
        let err = s.unassign(OperatorId(1), InstanceId::generate()).unwrap_err();
        assert!(matches!(err, BalancingError::AssignmentNotFound { .. }));
    }

    #[test]
    fn test_resize_preserves_slots_and_releases_removed() {
        let mut s = store(3);
        s.rename_operator(OperatorId(1), "张三").unwrap();
        s.assign("O1", OperatorId(1), 20).unwrap();
        s.assign("O1", OperatorId(3), 25).unwrap();
        s.assign("O2", OperatorId(3), 50).unwrap();

        let released = s.resize_headcount(2).unwrap();
        assert_eq!(released.len(), 2);
        assert_eq!(s.headcount(), 2);
        assert_eq!(s.operators()[0].display_name, "张三");
        assert_eq!(s.capacity("O1").unwrap().assigned_units_per_hour, 20);
        assert_eq!(s.capacity("O2").unwrap().assigned_units_per_hour, 0);

        // 新槽位使用新的稳定ID,不复用被移除的 OP-3
        s.resize_headcount(4).unwrap();
        let ids: Vec<u32> = s.operators().iter().map(|o| o.operator_id.0).collect();
        assert_eq!(ids, vec![1, 2, 4, 5]);
        assert_eq!(s.operators()[3].display_name, "Operator 4");
        s.check_invariants().unwrap();

        assert_eq!(s.resize_headcount(0).unwrap_err(), BalancingError::InvalidHeadcount(0));
    }

    #[test]
    fn test_replay_saved_session() {
        let saved = SavedSession {
            session_id: "S1".to_string(),
            product_id: "P1".to_string(),
            headcount: 3,
            operators: vec![
                SavedOperator { operator_id: OperatorId(4), display_name: "李四".to_string() },
                SavedOperator { operator_id: OperatorId(7), display_name: "王五".to_string() },
            ],
            assignments: vec![
                SavedAssignment { operator_id: OperatorId(4), operation_id: "O1".to_string(), assigned_units_per_hour: 30 },
                SavedAssignment { operator_id: OperatorId(7), operation_id: "O1".to_string(), assigned_units_per_hour: 30 },
                SavedAssignment { operator_id: OperatorId(7), operation_id: "O2".to_string(), assigned_units_per_hour: 100 },
            ],
        };

        let s = BalancingStore::initialize("P1", ops(), 3, "Operator", Some(&saved)).unwrap();
        assert_eq!(s.headcount(), 3);
        assert_eq!(s.operators()[2].operator_id, OperatorId(8));
        assert_eq!(s.capacity("O1").unwrap().pending_units_per_hour(), 0);
        assert_eq!(s.capacity("O2").unwrap().pending_units_per_hour(), 20);
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_replay_rejects_over_capacity() {
        let saved = SavedSession {
            session_id: "S1".to_string(),
            product_id: "P1".to_string(),
            headcount: 1,
            operators: vec![SavedOperator { operator_id: OperatorId(1), display_name: "A".to_string() }],
            assignments: vec![
                SavedAssignment { operator_id: OperatorId(1), operation_id: "O1".to_string(), assigned_units_per_hour: 50 },
                SavedAssignment { operator_id: OperatorId(1), operation_id: "O1".to_string(), assigned_units_per_hour: 50 },
            ],
        };
        let err = BalancingStore::initialize("P1", ops(), 1, "Operator", Some(&saved)).unwrap_err();
        assert!(matches!(err, BalancingError::InvalidSavedSession(_)));
    }
}
