// ==========================================
// 生产线平衡引擎 - 应用层
// ==========================================
// 职责: 组装仓储、配置与 API,供宿主（命令行/界面）使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
