// ==========================================
// 生产线平衡引擎 - 工序与工序产能领域模型
// ==========================================
// 职责: 工序参考数据 (SAM) 与未分配产能池条目
// 红线: assigned_units_per_hour 始终落在 [0, total_units_per_hour]
// ==========================================

use crate::domain::types::MINUTES_PER_HOUR;
use serde::{Deserialize, Serialize};

// ==========================================
// Operation - 工序
// ==========================================
// 会话期间不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,                  // 工序编号
    pub name: String,                // 工序名称
    pub process_id: String,          // 工艺类别
    pub standard_time_minutes: f64,  // 标准工时 SAM (分钟/件)
}

impl Operation {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        process_id: impl Into<String>,
        standard_time_minutes: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            process_id: process_id.into(),
            standard_time_minutes,
        }
    }

    /// 是否可产出（小时产能取整后至少 1 件）
    ///
    /// SAM 非正、非有限值或超过 120 分钟时不可产出
    pub fn is_producible(&self) -> bool {
        self.total_units_per_hour() > 0
    }

    /// 单工序小时产能 = round(60 / SAM)
    ///
    /// # 返回
    /// SAM 非正时返回 0;SAM 超过 120 分钟时取整为 0
    pub fn total_units_per_hour(&self) -> u32 {
        if !self.standard_time_minutes.is_finite() || self.standard_time_minutes <= 0.0 {
            return 0;
        }
        let uph = (MINUTES_PER_HOUR / self.standard_time_minutes).round();
        if uph >= u32::MAX as f64 {
            u32::MAX
        } else {
            uph as u32
        }
    }
}

// ==========================================
// OperationCapacity - 工序产能池条目
// ==========================================
// pending 由 total - assigned 推导,不单独存储
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCapacity {
    pub operation_id: String,
    pub total_units_per_hour: u32,
    pub assigned_units_per_hour: u32,
}

impl OperationCapacity {
    /// 以工序创建空产能条目
    pub fn for_operation(operation: &Operation) -> Self {
        Self {
            operation_id: operation.id.clone(),
            total_units_per_hour: operation.total_units_per_hour(),
            assigned_units_per_hour: 0,
        }
    }

    /// 待分配产能
    pub fn pending_units_per_hour(&self) -> u32 {
        self.total_units_per_hour
            .saturating_sub(self.assigned_units_per_hour)
    }

    /// 是否已全部分配
    pub fn is_fully_assigned(&self) -> bool {
        self.pending_units_per_hour() == 0
    }

    /// 已分配比例 (0.0 - 1.0)
    pub fn assigned_ratio(&self) -> f64 {
        if self.total_units_per_hour == 0 {
            return 0.0;
        }
        self.assigned_units_per_hour as f64 / self.total_units_per_hour as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_units_per_hour_rounds() {
        assert_eq!(Operation::new("O1", "合缝", "SEW", 1.0).total_units_per_hour(), 60);
        // 60 / 0.7 = 85.71 → 86
        assert_eq!(Operation::new("O2", "锁边", "SEW", 0.7).total_units_per_hour(), 86);
        // 60 / 1.6 = 37.5 → 38
        assert_eq!(Operation::new("O3", "包装", "PACK", 1.6).total_units_per_hour(), 38);
    }

    #[test]
    fn test_non_positive_sam_is_not_producible() {
        let zero = Operation::new("O1", "检验", "QC", 0.0);
        let negative = Operation::new("O2", "检验", "QC", -1.0);
        let nan = Operation::new("O3", "检验", "QC", f64::NAN);

        for op in [zero, negative, nan] {
            assert!(!op.is_producible());
            assert_eq!(op.total_units_per_hour(), 0);
        }
    }

    #[test]
    fn test_sam_above_two_hours_rounds_to_zero_capacity() {
        // 60 / 120 = 0.5 → 1
        let edge = Operation::new("O1", "整烫", "PRESS", 120.0);
        assert_eq!(edge.total_units_per_hour(), 1);
        assert!(edge.is_producible());

        // 60 / 150 = 0.4 → 0
        let slow = Operation::new("O2", "手工绣花", "EMB", 150.0);
        assert_eq!(slow.total_units_per_hour(), 0);
        assert!(!slow.is_producible());
    }

    #[test]
    fn test_capacity_pending_is_complement() {
        let op = Operation::new("O1", "合缝", "SEW", 1.0);
        let mut capacity = OperationCapacity::for_operation(&op);
        assert_eq!(capacity.pending_units_per_hour(), 60);

        capacity.assigned_units_per_hour = 45;
        assert_eq!(capacity.pending_units_per_hour(), 15);
        assert_eq!(
            capacity.assigned_units_per_hour + capacity.pending_units_per_hour(),
            capacity.total_units_per_hour
        );
        assert!((capacity.assigned_ratio() - 0.75).abs() < 1e-12);
        assert!(!capacity.is_fully_assigned());
    }
}
