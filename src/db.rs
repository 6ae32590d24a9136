// ==========================================
// 生产线平衡引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建库（幂等）并记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：foreign_keys / busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建库（所有语句均为 IF NOT EXISTS,可重复执行）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS product (
            product_id TEXT PRIMARY KEY,
            product_name TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS operation (
            product_id TEXT NOT NULL REFERENCES product(product_id) ON DELETE CASCADE,
            operation_id TEXT NOT NULL,
            seq_no INTEGER NOT NULL,
            operation_name TEXT NOT NULL,
            process_id TEXT NOT NULL,
            standard_time_min REAL NOT NULL,
            PRIMARY KEY (product_id, operation_id)
        );

        CREATE TABLE IF NOT EXISTS balancing_header (
            session_id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES product(product_id),
            headcount INTEGER NOT NULL,
            total_standard_time REAL NOT NULL,
            units_per_hour INTEGER NOT NULL,
            takt_time REAL NOT NULL,
            required_machines REAL NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS balancing_operator (
            session_id TEXT NOT NULL REFERENCES balancing_header(session_id) ON DELETE CASCADE,
            operator_id INTEGER NOT NULL,
            seq_no INTEGER NOT NULL,
            display_name TEXT NOT NULL,
            occupied_minutes REAL NOT NULL,
            occupancy_pct REAL NOT NULL,
            PRIMARY KEY (session_id, operator_id)
        );

        CREATE TABLE IF NOT EXISTS balancing_assignment (
            session_id TEXT NOT NULL,
            operator_id INTEGER NOT NULL,
            seq_no INTEGER NOT NULL,
            operation_id TEXT NOT NULL,
            assigned_uph INTEGER NOT NULL CHECK (assigned_uph > 0),
            PRIMARY KEY (session_id, operator_id, seq_no),
            FOREIGN KEY (session_id, operator_id)
                REFERENCES balancing_operator(session_id, operator_id) ON DELETE CASCADE
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
