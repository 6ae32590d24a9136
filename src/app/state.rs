// ==========================================
// 生产线平衡引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{BalancingApi, ConfigApi};
use crate::config::balancing_config::BalancingConfigReader;
use crate::config::config_manager::ConfigManager;
use crate::engine::events::{BalancingEventPublisher, LoggingEventPublisher};
use crate::repository::{BalancingSessionRepository, OperationCatalogRepository};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "LINE_BALANCING_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 平衡会话API
    pub balancing_api: Arc<BalancingApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,

    /// 事件发布器
    pub event_publisher: Option<Arc<dyn BalancingEventPublisher>>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（":memory:" 可用于临时会话）
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并建表
    /// 2. 读取平衡配置
    /// 3. 创建仓储与API实例
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let catalog_repo = Arc::new(OperationCatalogRepository::from_connection(conn.clone()));
        let session_repo = Arc::new(BalancingSessionRepository::from_connection(conn.clone()));

        // ==========================================
        // 读取配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_balancing_config()
            .await
            .map_err(|e| format!("平衡配置读取失败: {}", e))?;
        tracing::debug!(?config, "平衡配置已加载");

        // ==========================================
        // 初始化API层
        // ==========================================
        let event_publisher: Option<Arc<dyn BalancingEventPublisher>> =
            Some(Arc::new(LoggingEventPublisher));

        let balancing_api = Arc::new(BalancingApi::new(
            config,
            catalog_repo,
            session_repo,
            event_publisher.clone(),
        ));
        let config_api = Arc::new(ConfigApi::new(config_manager));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            balancing_api,
            config_api,
            event_publisher,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 LINE_BALANCING_DB_PATH（非空时优先）
/// - 开发环境: 用户数据目录/line-balancing-dev/line_balancing.db
/// - 生产环境: 用户数据目录/line-balancing/line_balancing.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./line_balancing.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("line-balancing-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("line-balancing");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("line_balancing.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
    }

    #[tokio::test]
    async fn test_app_state_in_memory() {
        let state = AppState::new(":memory:".to_string()).await.unwrap();
        assert_eq!(state.get_db_path(), ":memory:");
        assert!(state.balancing_api.list_products().unwrap().is_empty());
        assert_eq!(
            state.config_api.get_balancing_config().await.unwrap().default_headcount,
            1
        );
    }
}
