// ==========================================
// 生产线平衡引擎 - 平衡会话边界记录
// ==========================================
// 职责: 持久化网关的输入/输出记录形状
// - SavedSession: 编辑模式下加载的已保存会话
// - SessionHeader / OperatorRecord: 保存时写出的表头与操作员记录
// ==========================================

use crate::domain::types::OperatorId;
use serde::{Deserialize, Serialize};

// ==========================================
// 已保存会话（加载输入）
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedOperator {
    pub operator_id: OperatorId,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAssignment {
    pub operator_id: OperatorId,
    pub operation_id: String,
    pub assigned_units_per_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub session_id: String,
    pub product_id: String,
    pub headcount: u32,
    pub operators: Vec<SavedOperator>,
    pub assignments: Vec<SavedAssignment>,
}

// ==========================================
// 保存输出
// ==========================================

/// 平衡表头
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub product_id: String,
    pub headcount: u32,
    pub total_standard_time: f64,
    pub units_per_hour: u64,
    pub takt_time: f64,
    pub required_machines: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub operation_id: String,
    pub assigned_units_per_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorRecord {
    pub operator_id: OperatorId,
    pub display_name: String,
    pub occupied_minutes: f64,
    pub occupancy_percentage: f64,
    pub assignments: Vec<AssignmentRecord>,
}

/// 一次保存所需的完整快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub header: SessionHeader,
    pub operators: Vec<OperatorRecord>,
}
