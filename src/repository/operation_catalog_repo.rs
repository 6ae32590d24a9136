// ==========================================
// 生产线平衡引擎 - 工序清单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: product / operation 表的读写,实现 OperationCatalog 边界
// ==========================================

use crate::domain::operation::Operation;
use crate::engine::error::{GatewayError, GatewayResult};
use crate::engine::gateway::OperationCatalog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 产品摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: String,
    pub product_name: Option<String>,
    pub operation_count: usize,
    pub total_standard_time: f64,
}

// ==========================================
// OperationCatalogRepository - 工序清单仓储
// ==========================================
pub struct OperationCatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OperationCatalogRepository {
    /// 创建新的工序清单仓储实例
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 整体替换产品工序清单（事务内: 删除旧清单 → 按顺序写入）
    ///
    /// # 返回
    /// 写入的工序数
    pub fn replace_operations(
        &self,
        product_id: &str,
        product_name: Option<&str>,
        operations: &[Operation],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            r#"
            INSERT INTO product (product_id, product_name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(product_id) DO UPDATE SET
                product_name = COALESCE(excluded.product_name, product.product_name),
                updated_at = excluded.updated_at
            "#,
            params![product_id, product_name, now],
        )?;

        tx.execute("DELETE FROM operation WHERE product_id = ?1", params![product_id])?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO operation (
                    product_id, operation_id, seq_no, operation_name, process_id, standard_time_min
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for (seq, op) in operations.iter().enumerate() {
                stmt.execute(params![
                    product_id,
                    op.id,
                    seq as i64 + 1,
                    op.name,
                    op.process_id,
                    op.standard_time_minutes,
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tracing::info!(product_id, count = operations.len(), "工序清单已替换");
        Ok(operations.len())
    }

    /// 查询产品的有序工序清单
    ///
    /// # 返回
    /// - Ok(Some(Vec)): 产品存在（清单可能为空）
    /// - Ok(None): 产品不存在
    pub fn find_operations(&self, product_id: &str) -> RepositoryResult<Option<Vec<Operation>>> {
        let conn = self.get_conn()?;

        let exists = conn
            .query_row(
                "SELECT 1 FROM product WHERE product_id = ?1",
                params![product_id],
                |_row| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT operation_id, operation_name, process_id, standard_time_min
            FROM operation
            WHERE product_id = ?1
            ORDER BY seq_no
            "#,
        )?;

        let operations = stmt
            .query_map(params![product_id], |row| {
                Ok(Operation {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    process_id: row.get(2)?,
                    standard_time_minutes: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<Operation>>>()?;

        Ok(Some(operations))
    }

    /// 产品列表（含工序数与总标准工时）
    pub fn list_products(&self) -> RepositoryResult<Vec<ProductSummary>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT
                p.product_id,
                p.product_name,
                COUNT(o.operation_id),
                COALESCE(SUM(CASE WHEN o.standard_time_min > 0 THEN o.standard_time_min ELSE 0 END), 0)
            FROM product p
            LEFT JOIN operation o ON o.product_id = p.product_id
            GROUP BY p.product_id, p.product_name
            ORDER BY p.product_id
            "#,
        )?;

        let products = stmt
            .query_map([], |row| {
                Ok(ProductSummary {
                    product_id: row.get(0)?,
                    product_name: row.get(1)?,
                    operation_count: row.get::<_, i64>(2)? as usize,
                    total_standard_time: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<ProductSummary>>>()?;

        Ok(products)
    }
}

impl OperationCatalog for OperationCatalogRepository {
    fn get_operations_for_product(&self, product_id: &str) -> GatewayResult<Vec<Operation>> {
        self.find_operations(product_id)?
            .ok_or_else(|| GatewayError::NotFound {
                entity: "product".to_string(),
                id: product_id.to_string(),
            })
    }
}
