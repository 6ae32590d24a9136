// ==========================================
// 生产线平衡引擎 - 平衡会话数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: balancing_header / balancing_operator / balancing_assignment 表读写
// 约束: 替换会话记录必须在单个事务内完成（读者看不到删一半的状态）
// ==========================================

use crate::domain::session::{SavedAssignment, SavedOperator, SavedSession, SessionSnapshot};
use crate::domain::types::OperatorId;
use crate::engine::error::GatewayResult;
use crate::engine::gateway::{PersistenceGateway, SavedSessionLoader};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 会话摘要（列表展示）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub product_id: String,
    pub headcount: u32,
    pub units_per_hour: u64,
    pub takt_time: f64,
    pub created_at: String,
    pub updated_at: String,
}

// ==========================================
// BalancingSessionRepository - 平衡会话仓储
// ==========================================
pub struct BalancingSessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BalancingSessionRepository {
    /// 创建新的会话仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存会话快照
    ///
    /// # 参数
    /// - `session_id`: 已有会话（替换其操作员/分配记录）或 None（新建）
    ///
    /// # 返回
    /// 会话ID
    pub fn save_snapshot(
        &self,
        session_id: Option<&str>,
        snapshot: &SessionSnapshot,
    ) -> RepositoryResult<String> {
        self.save_snapshot_unless_abandoned(session_id, snapshot, &AtomicBool::new(false))
    }

    /// 保存会话快照（取得连接后若调用方已放弃则不写入）
    fn save_snapshot_unless_abandoned(
        &self,
        session_id: Option<&str>,
        snapshot: &SessionSnapshot,
        abandoned: &AtomicBool,
    ) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        if abandoned.load(Ordering::SeqCst) {
            tracing::warn!("调用方已放弃本次保存,跳过写入");
            return Err(RepositoryError::DatabaseTransactionError(
                "调用方已放弃本次保存".to_string(),
            ));
        }
        let now = Utc::now().to_rfc3339();
        let header = &snapshot.header;

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let session_id = match session_id {
            Some(id) => {
                let updated = tx.execute(
                    r#"
                    UPDATE balancing_header SET
                        product_id = ?2, headcount = ?3, total_standard_time = ?4,
                        units_per_hour = ?5, takt_time = ?6, required_machines = ?7,
                        updated_at = ?8
                    WHERE session_id = ?1
                    "#,
                    params![
                        id,
                        header.product_id,
                        header.headcount,
                        header.total_standard_time,
                        header.units_per_hour as i64,
                        header.takt_time,
                        header.required_machines,
                        now,
                    ],
                )?;
                if updated == 0 {
                    return Err(RepositoryError::NotFound {
                        entity: "balancing_header".to_string(),
                        id: id.to_string(),
                    });
                }
                tx.execute(
                    "DELETE FROM balancing_assignment WHERE session_id = ?1",
                    params![id],
                )?;
                tx.execute(
                    "DELETE FROM balancing_operator WHERE session_id = ?1",
                    params![id],
                )?;
                id.to_string()
            }
            None => {
                let id = Uuid::new_v4().to_string();
                tx.execute(
                    r#"
                    INSERT INTO balancing_header (
                        session_id, product_id, headcount, total_standard_time,
                        units_per_hour, takt_time, required_machines, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                    "#,
                    params![
                        id,
                        header.product_id,
                        header.headcount,
                        header.total_standard_time,
                        header.units_per_hour as i64,
                        header.takt_time,
                        header.required_machines,
                        now,
                    ],
                )?;
                id
            }
        };

        {
            let mut op_stmt = tx.prepare(
                r#"
                INSERT INTO balancing_operator (
                    session_id, operator_id, seq_no, display_name, occupied_minutes, occupancy_pct
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            let mut asg_stmt = tx.prepare(
                r#"
                INSERT INTO balancing_assignment (
                    session_id, operator_id, seq_no, operation_id, assigned_uph
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;

            for (op_seq, operator) in snapshot.operators.iter().enumerate() {
                op_stmt.execute(params![
                    session_id,
                    operator.operator_id.0,
                    op_seq as i64 + 1,
                    operator.display_name,
                    operator.occupied_minutes,
                    operator.occupancy_percentage,
                ])?;
                for (asg_seq, assignment) in operator.assignments.iter().enumerate() {
                    asg_stmt.execute(params![
                        session_id,
                        operator.operator_id.0,
                        asg_seq as i64 + 1,
                        assignment.operation_id,
                        assignment.assigned_units_per_hour,
                    ])?;
                }
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tracing::info!(
            session_id = %session_id,
            product_id = %header.product_id,
            operators = snapshot.operators.len(),
            "平衡会话已落库"
        );
        Ok(session_id)
    }

    /// 加载已保存会话（操作员按保存顺序,分配按操作员内顺序）
    pub fn load_session(&self, session_id: &str) -> RepositoryResult<SavedSession> {
        let conn = self.get_conn()?;

        let (product_id, headcount): (String, u32) = conn
            .query_row(
                "SELECT product_id, headcount FROM balancing_header WHERE session_id = ?1",
                params![session_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "balancing_header".to_string(),
                id: session_id.to_string(),
            })?;

        let mut stmt = conn.prepare(
            r#"
            SELECT operator_id, display_name
            FROM balancing_operator
            WHERE session_id = ?1
            ORDER BY seq_no
            "#,
        )?;
        let operators = stmt
            .query_map(params![session_id], |row| {
                Ok(SavedOperator {
                    operator_id: OperatorId(row.get(0)?),
                    display_name: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<SavedOperator>>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT a.operator_id, a.operation_id, a.assigned_uph
            FROM balancing_assignment a
            JOIN balancing_operator o
              ON o.session_id = a.session_id AND o.operator_id = a.operator_id
            WHERE a.session_id = ?1
            ORDER BY o.seq_no, a.seq_no
            "#,
        )?;
        let assignments = stmt
            .query_map(params![session_id], |row| {
                Ok(SavedAssignment {
                    operator_id: OperatorId(row.get(0)?),
                    operation_id: row.get(1)?,
                    assigned_units_per_hour: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<SavedAssignment>>>()?;

        Ok(SavedSession {
            session_id: session_id.to_string(),
            product_id,
            headcount,
            operators,
            assignments,
        })
    }

    /// 会话列表（可按产品过滤,按更新时间倒序）
    pub fn list_sessions(&self, product_id: Option<&str>) -> RepositoryResult<Vec<SessionSummary>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT session_id, product_id, headcount, units_per_hour, takt_time, created_at, updated_at
            FROM balancing_header
            WHERE ?1 IS NULL OR product_id = ?1
            ORDER BY updated_at DESC, session_id
            "#,
        )?;

        let sessions = stmt
            .query_map(params![product_id], |row| {
                Ok(SessionSummary {
                    session_id: row.get(0)?,
                    product_id: row.get(1)?,
                    headcount: row.get(2)?,
                    units_per_hour: row.get::<_, i64>(3)? as u64,
                    takt_time: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            })?
            .collect::<SqliteResult<Vec<SessionSummary>>>()?;

        Ok(sessions)
    }

    /// 删除会话（级联删除操作员与分配）
    pub fn delete_session(&self, session_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM balancing_header WHERE session_id = ?1",
            params![session_id],
        )?;
        if deleted == 0 {
            return Err(RepositoryError::NotFound {
                entity: "balancing_header".to_string(),
                id: session_id.to_string(),
            });
        }
        Ok(())
    }
}

impl SavedSessionLoader for BalancingSessionRepository {
    fn get_saved_assignments(&self, session_id: &str) -> GatewayResult<SavedSession> {
        Ok(self.load_session(session_id)?)
    }
}

/// future 被丢弃（如调用方超时）时标记保存已放弃
struct AbandonOnDrop(Arc<AtomicBool>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PersistenceGateway for BalancingSessionRepository {
    /// 在阻塞线程池中执行事务,调用方的超时可以生效
    async fn save_session(
        &self,
        session_id: Option<&str>,
        snapshot: &SessionSnapshot,
    ) -> GatewayResult<String> {
        let abandoned = Arc::new(AtomicBool::new(false));
        let _guard = AbandonOnDrop(abandoned.clone());

        let repo = Self::from_connection(self.conn.clone());
        let session_id = session_id.map(str::to_string);
        let snapshot = snapshot.clone();

        let result = tokio::task::spawn_blocking(move || {
            repo.save_snapshot_unless_abandoned(session_id.as_deref(), &snapshot, &abandoned)
        })
        .await
        .map_err(|e| RepositoryError::InternalError(format!("保存任务执行失败: {}", e)))?;

        Ok(result?)
    }
}
