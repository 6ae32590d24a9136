// ==========================================
// 生产线平衡引擎 - 交互事件发布
// ==========================================
// 职责: 定义平衡变更事件与发布 trait,供界面层重绘
// 说明: Engine 层定义 trait,宿主实现适配器（不限定事件总线技术）
// 约束: 发布失败只记录日志,不影响已完成的变更
// ==========================================

use crate::domain::operator::OperationAssignment;
use crate::domain::types::{InstanceId, OperatorId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 平衡事件
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalancingEvent {
    SessionInitialized {
        product_id: String,
        headcount: u32,
    },
    AssignmentCreated {
        assignment: OperationAssignment,
    },
    AssignmentRemoved {
        assignment: OperationAssignment,
    },
    AssignmentResized {
        operator_id: OperatorId,
        instance_id: InstanceId,
        previous_units_per_hour: u32,
        units_per_hour: u32,
    },
    HeadcountChanged {
        previous: u32,
        current: u32,
        released: Vec<OperationAssignment>,
    },
    OperatorRenamed {
        operator_id: OperatorId,
        display_name: String,
    },
    SessionSaved {
        session_id: String,
    },
    SessionDiscarded {
        product_id: String,
    },
}

impl BalancingEvent {
    /// 事件类型标识
    pub fn as_str(&self) -> &str {
        match self {
            BalancingEvent::SessionInitialized { .. } => "SessionInitialized",
            BalancingEvent::AssignmentCreated { .. } => "AssignmentCreated",
            BalancingEvent::AssignmentRemoved { .. } => "AssignmentRemoved",
            BalancingEvent::AssignmentResized { .. } => "AssignmentResized",
            BalancingEvent::HeadcountChanged { .. } => "HeadcountChanged",
            BalancingEvent::OperatorRenamed { .. } => "OperatorRenamed",
            BalancingEvent::SessionSaved { .. } => "SessionSaved",
            BalancingEvent::SessionDiscarded { .. } => "SessionDiscarded",
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 平衡事件发布者
pub trait BalancingEventPublisher: Send + Sync {
    fn publish(&self, event: BalancingEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者（单元测试等场景）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl BalancingEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: BalancingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpEventPublisher: 跳过事件发布 - event_type={}", event.as_str());
        Ok(())
    }
}

/// 日志事件发布者（命令行宿主: 事件以 JSON 写入日志）
#[derive(Debug, Clone, Default)]
pub struct LoggingEventPublisher;

impl BalancingEventPublisher for LoggingEventPublisher {
    fn publish(&self, event: BalancingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let payload = serde_json::to_string(&event)?;
        tracing::info!(event_type = event.as_str(), payload = %payload, "平衡事件");
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn BalancingEventPublisher>> 的使用;发布失败只告警
#[derive(Clone, Default)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn BalancingEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn BalancingEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn publish(&self, event: BalancingEvent) {
        let event_type = event.as_str().to_string();
        match &self.inner {
            Some(publisher) => {
                if let Err(e) = publisher.publish(event) {
                    tracing::warn!("事件发布失败 - event_type={}, error={}", event_type, e);
                }
            }
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - event_type={}",
                    event_type
                );
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl std::fmt::Debug for OptionalEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionalEventPublisher")
            .field("configured", &self.is_configured())
            .finish()
    }
}
