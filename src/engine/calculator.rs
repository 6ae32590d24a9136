// ==========================================
// 生产线平衡引擎 - 平衡计算器
// ==========================================
// 职责: 从平衡状态快照推导聚合指标（纯函数,无副作用）
// 输入: BalancingStore 快照
// 输出: 总标准工时、小时产量、节拍、设备需求、操作员负荷、负荷汇总
// ==========================================
// 说明: 内部不做任何舍入;展示层负责格式化。
// 唯一的整数量是 units_per_hour（向下取整的整件数）。
// 负荷按 UPH 份额折算: minutes = SAM × assigned / total_uph,不按操作员归一。
// ==========================================

use crate::domain::operation::Operation;
use crate::domain::operator::Operator;
use crate::domain::types::{InstanceId, OperatorId, MINUTES_PER_HOUR};
use crate::engine::balancing_store::BalancingStore;
use serde::{Deserialize, Serialize};

// ==========================================
// 计算结果
// ==========================================

/// 单个操作员负荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorLoad {
    pub operator_id: OperatorId,
    pub display_name: String,
    pub occupied_minutes: f64,
    pub occupancy_percentage: f64,
    /// 无法计算份额的分配（工序总产能为 0）
    pub degraded_assignments: Vec<InstanceId>,
}

/// 负荷汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSummary {
    pub average_occupancy: f64,
    pub most_loaded: Option<OperatorId>,
    pub least_loaded: Option<OperatorId>,
    /// 最大与最小负荷率之差
    pub occupancy_spread: f64,
    /// 平均负荷率 / 最大负荷率 × 100
    pub balance_efficiency: f64,
}

/// 平衡指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancingMetrics {
    pub total_standard_time: f64,
    pub units_per_hour: u64,
    pub takt_time: f64,
    pub required_machines: f64,
    pub operator_loads: Vec<OperatorLoad>,
    pub summary: WorkloadSummary,
    /// 尚未分配的标准工时（分钟）
    pub unassigned_minutes: f64,
    /// 小时产能为 0 的工序
    pub degraded_operations: Vec<String>,
}

impl BalancingMetrics {
    pub fn load_of(&self, operator_id: OperatorId) -> Option<&OperatorLoad> {
        self.operator_loads
            .iter()
            .find(|l| l.operator_id == operator_id)
    }

    pub fn has_degraded_data(&self) -> bool {
        !self.degraded_operations.is_empty()
            || self
                .operator_loads
                .iter()
                .any(|l| !l.degraded_assignments.is_empty())
    }
}

// ==========================================
// BalancingCalculator - 平衡计算器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancingCalculator;

impl BalancingCalculator {
    pub fn new() -> Self {
        Self
    }

    /// 计算全部指标
    pub fn compute(&self, store: &BalancingStore) -> BalancingMetrics {
        let headcount = store.headcount();
        let total_standard_time = Self::total_standard_time(store.operations());
        let units_per_hour = Self::units_per_hour(total_standard_time, headcount);
        let takt_time = Self::takt_time(total_standard_time, headcount);
        let required_machines = Self::required_machines(store.operations(), takt_time);

        let operator_loads: Vec<OperatorLoad> = store
            .operators()
            .iter()
            .map(|operator| self.operator_load(store, operator, takt_time))
            .collect();

        let summary = Self::summarize(&operator_loads);

        BalancingMetrics {
            total_standard_time,
            units_per_hour,
            takt_time,
            required_machines,
            operator_loads,
            summary,
            unassigned_minutes: Self::unassigned_minutes(store),
            degraded_operations: store.degraded_operations(),
        }
    }

    /// 总标准工时 = Σ SAM（仅可产出工序）
    pub fn total_standard_time(operations: &[Operation]) -> f64 {
        operations
            .iter()
            .filter(|op| op.is_producible())
            .map(|op| op.standard_time_minutes)
            .sum()
    }

    /// 线体小时产量 = floor(60 × 人数 / 总标准工时)
    pub fn units_per_hour(total_standard_time: f64, headcount: u32) -> u64 {
        if total_standard_time <= 0.0 {
            return 0;
        }
        (MINUTES_PER_HOUR * headcount as f64 / total_standard_time).floor() as u64
    }

    /// 节拍 = 总标准工时 / 人数
    pub fn takt_time(total_standard_time: f64, headcount: u32) -> f64 {
        if headcount == 0 {
            return 0.0;
        }
        total_standard_time / headcount as f64
    }

    /// 设备需求 = Σ (SAM / 节拍)
    pub fn required_machines(operations: &[Operation], takt_time: f64) -> f64 {
        if takt_time <= 0.0 {
            return 0.0;
        }
        operations
            .iter()
            .filter(|op| op.is_producible())
            .map(|op| op.standard_time_minutes / takt_time)
            .sum()
    }

    /// 单个操作员负荷（按 UPH 份额折算标准工时）
    ///
    /// share = assigned / total_uph, minutes = SAM × share
    /// 工序 total_uph 为 0 时该分配贡献 0 并记为降级
    pub fn operator_load(
        &self,
        store: &BalancingStore,
        operator: &Operator,
        takt_time: f64,
    ) -> OperatorLoad {
        let mut occupied_minutes = 0.0;
        let mut degraded_assignments = Vec::new();

        for assignment in &operator.assignments {
            let operation = store.operation(&assignment.operation_id);
            let total_uph = operation.map(|op| op.total_units_per_hour()).unwrap_or(0);

            match operation {
                Some(op) if total_uph > 0 => {
                    let share = assignment.assigned_units_per_hour as f64 / total_uph as f64;
                    occupied_minutes += op.standard_time_minutes * share;
                }
                _ => {
                    tracing::warn!(
                        operator = %operator.operator_id,
                        operation_id = %assignment.operation_id,
                        "工序总产能为 0,无法计算份额"
                    );
                    degraded_assignments.push(assignment.instance_id);
                }
            }
        }

        let occupancy_percentage = if takt_time > 0.0 {
            occupied_minutes / takt_time * 100.0
        } else {
            0.0
        };

        OperatorLoad {
            operator_id: operator.operator_id,
            display_name: operator.display_name.clone(),
            occupied_minutes,
            occupancy_percentage,
            degraded_assignments,
        }
    }

    /// 负荷汇总
    ///
    /// 并列时取 operator_id 最小者
    pub fn summarize(loads: &[OperatorLoad]) -> WorkloadSummary {
        if loads.is_empty() {
            return WorkloadSummary {
                average_occupancy: 0.0,
                most_loaded: None,
                least_loaded: None,
                occupancy_spread: 0.0,
                balance_efficiency: 0.0,
            };
        }

        let average_occupancy =
            loads.iter().map(|l| l.occupancy_percentage).sum::<f64>() / loads.len() as f64;

        let mut most = &loads[0];
        let mut least = &loads[0];
        for load in &loads[1..] {
            if load.occupancy_percentage > most.occupancy_percentage
                || (load.occupancy_percentage == most.occupancy_percentage
                    && load.operator_id < most.operator_id)
            {
                most = load;
            }
            if load.occupancy_percentage < least.occupancy_percentage
                || (load.occupancy_percentage == least.occupancy_percentage
                    && load.operator_id < least.operator_id)
            {
                least = load;
            }
        }

        let max = most.occupancy_percentage;
        let balance_efficiency = if max > 0.0 {
            average_occupancy / max * 100.0
        } else {
            0.0
        };

        WorkloadSummary {
            average_occupancy,
            most_loaded: Some(most.operator_id),
            least_loaded: Some(least.operator_id),
            occupancy_spread: max - least.occupancy_percentage,
            balance_efficiency,
        }
    }

    /// 未分配标准工时 = Σ SAM × pending / total_uph
    pub fn unassigned_minutes(store: &BalancingStore) -> f64 {
        store
            .operations()
            .iter()
            .zip(store.capacities())
            .filter(|(_, cap)| cap.total_units_per_hour > 0)
            .map(|(op, cap)| {
                op.standard_time_minutes * cap.pending_units_per_hour() as f64
                    / cap.total_units_per_hour as f64
            })
            .sum()
    }
}
