// ==========================================
// 生产线平衡引擎 - 操作员与工序分配领域模型
// ==========================================
// 职责: 操作员槽位及其名下的工序分配实例
// 约束: 分配实例通过 operation_id 关联工序产能池
// ==========================================

use crate::domain::types::{InstanceId, OperatorId};
use serde::{Deserialize, Serialize};

// ==========================================
// OperationAssignment - 工序分配实例
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationAssignment {
    pub instance_id: InstanceId,
    pub operation_id: String,
    pub operator_id: OperatorId,
    pub assigned_units_per_hour: u32, // > 0
}

// ==========================================
// Operator - 操作员槽位
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub operator_id: OperatorId,
    pub display_name: String,
    pub assignments: Vec<OperationAssignment>,
}

impl Operator {
    /// 创建空槽位
    pub fn empty(operator_id: OperatorId, display_name: impl Into<String>) -> Self {
        Self {
            operator_id,
            display_name: display_name.into(),
            assignments: Vec::new(),
        }
    }

    /// 默认显示名称: "{prefix} {position}"（position 从 1 开始）
    pub fn default_name(prefix: &str, position: usize) -> String {
        format!("{} {}", prefix, position)
    }

    pub fn find_assignment(&self, instance_id: InstanceId) -> Option<&OperationAssignment> {
        self.assignments
            .iter()
            .find(|a| a.instance_id == instance_id)
    }

    pub fn find_assignment_mut(
        &mut self,
        instance_id: InstanceId,
    ) -> Option<&mut OperationAssignment> {
        self.assignments
            .iter_mut()
            .find(|a| a.instance_id == instance_id)
    }

    /// 名下所有分配的 UPH 合计（跨工序,仅用于展示）
    pub fn total_assigned_units(&self) -> u64 {
        self.assignments
            .iter()
            .map(|a| a.assigned_units_per_hour as u64)
            .sum()
    }
}
