// ==========================================
// 会话保存 / 加载集成测试
// ==========================================
// 测试目标:
// - 保存 → 编辑模式加载 往返一致
// - 再次保存整体替换旧记录
// - 网关失败/超时时内存会话不变且保持未保存
// - 替换过程中失败时事务回滚,旧记录完整
// ==========================================


use async_trait::async_trait;
use line_balancing::config::BalancingConfig;
use line_balancing::domain::{Operation, OperatorId, SessionPhase, SessionSnapshot};
use line_balancing::engine::{
    BalancingError, BalancingWorkflow, GatewayError, GatewayResult, PersistenceGateway,
    PlacementIntent, SavedSessionLoader,
};
use line_balancing::repository::{
    BalancingSessionRepository, OperationCatalogRepository, RepositoryError,
};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use test_helpers::{
    create_repositories, create_test_db, open_shared_connection, tshirt_operations,
    CollectingPublisher,
};

struct Fixture {
    _db: tempfile::NamedTempFile,
    catalog: Arc<OperationCatalogRepository>,
    sessions: Arc<BalancingSessionRepository>,
}

fn fixture_with(operations: &[Operation]) -> Fixture {
    let (db, path) = create_test_db().unwrap();
    let (catalog, sessions) = create_repositories(&path).unwrap();
    catalog
        .replace_operations("P1", Some("T恤"), operations)
        .unwrap();
    Fixture {
        _db: db,
        catalog,
        sessions,
    }
}

fn fixture() -> Fixture {
    fixture_with(&tshirt_operations())
}

fn workflow() -> BalancingWorkflow {
    BalancingWorkflow::new(BalancingConfig::default(), None)
}

/// 始终失败的网关
struct FailingGateway;

#[async_trait]
impl PersistenceGateway for FailingGateway {
    async fn save_session(
        &self,
        _session_id: Option<&str>,
        _snapshot: &SessionSnapshot,
    ) -> GatewayResult<String> {
        Err(GatewayError::Unavailable("connection reset".to_string()))
    }
}

/// 响应缓慢的网关
struct SlowGateway(Duration);

#[async_trait]
impl PersistenceGateway for SlowGateway {
    async fn save_session(
        &self,
        _session_id: Option<&str>,
        _snapshot: &SessionSnapshot,
    ) -> GatewayResult<String> {
        tokio::time::sleep(self.0).await;
        Ok("late".to_string())
    }
}

// ==========================================
// 往返
// ==========================================

#[tokio::test]
async fn test_save_then_open_restores_session() {
    let fx = fixture();
    let mut wf = workflow();
    wf.select_product(fx.catalog.as_ref(), "P1", Some(3)).unwrap();
    wf.rename_operator(OperatorId(2), "李四").unwrap();
    wf.place(&PlacementIntent::new("O1", OperatorId(1)).with_units(70))
        .unwrap();
    wf.place(&PlacementIntent::new("O1", OperatorId(2)).with_units(50))
        .unwrap();
    wf.place(&PlacementIntent::new("O3", OperatorId(2)).with_units(15))
        .unwrap();

    let session_id = wf.save(fx.sessions.as_ref()).await.unwrap();
    assert!(!wf.has_unsaved_changes());
    assert_eq!(wf.session_id(), Some(session_id.as_str()));

    let mut reopened = workflow();
    reopened
        .open_saved(fx.catalog.as_ref(), fx.sessions.as_ref(), &session_id)
        .unwrap();
    let store = reopened.store().unwrap();

    assert_eq!(store.headcount(), 3);
    assert_eq!(store.operators()[1].display_name, "李四");
    assert_eq!(store.operators()[1].assignments.len(), 2);
    assert_eq!(store.capacity("O1").unwrap().pending_units_per_hour(), 0);
    assert_eq!(store.capacity("O3").unwrap().pending_units_per_hour(), 25);
    assert!(!reopened.has_unsaved_changes());
    assert_eq!(
        reopened.metrics().unwrap(),
        wf.metrics().unwrap()
    );
}

#[tokio::test]
async fn test_resave_replaces_previous_records() {
    let fx = fixture();
    let mut wf = workflow();
    wf.select_product(fx.catalog.as_ref(), "P1", Some(2)).unwrap();
    let a = wf
        .place(&PlacementIntent::new("O2", OperatorId(1)).with_units(40))
        .unwrap();
    wf.place(&PlacementIntent::new("O4", OperatorId(2))).unwrap();
    let first_id = wf.save(fx.sessions.as_ref()).await.unwrap();

    wf.remove_assignment(OperatorId(1), a.instance_id).unwrap();
    wf.change_headcount(1).unwrap();
    assert!(wf.has_unsaved_changes());
    let second_id = wf.save(fx.sessions.as_ref()).await.unwrap();
    assert_eq!(first_id, second_id);

    let saved = fx.sessions.get_saved_assignments(&first_id).unwrap();
    assert_eq!(saved.headcount, 1);
    assert_eq!(saved.operators.len(), 1);
    assert!(saved.assignments.is_empty());
    assert_eq!(fx.sessions.list_sessions(Some("P1")).unwrap().len(), 1);
}

#[tokio::test]
async fn test_open_unknown_session_is_invalid_saved_session() {
    let fx = fixture();
    let mut wf = workflow();

    let err = wf
        .open_saved(fx.catalog.as_ref(), fx.sessions.as_ref(), "missing")
        .unwrap_err();
    assert!(matches!(err, BalancingError::InvalidSavedSession(_)));
    assert_eq!(wf.phase(), SessionPhase::Uninitialized);
}

// ==========================================
// 保存失败
// ==========================================

#[tokio::test]
async fn test_failed_save_keeps_session_dirty_and_unchanged() {
    let fx = fixture();
    let collector = Arc::new(CollectingPublisher::default());
    let mut wf = BalancingWorkflow::new(BalancingConfig::default(), Some(collector.clone()));
    wf.select_product(fx.catalog.as_ref(), "P1", Some(2)).unwrap();
    wf.place(&PlacementIntent::new("O1", OperatorId(1)).with_units(60))
        .unwrap();
    let before = wf.store().unwrap().clone();
    let revision = wf.revision();

    let err = wf.save(&FailingGateway).await.unwrap_err();
    assert!(matches!(err, BalancingError::PersistenceFailure(_)));
    assert!(wf.has_unsaved_changes());
    assert_eq!(wf.revision(), revision);
    assert_eq!(wf.session_id(), None);
    assert_eq!(wf.store().unwrap().operators(), before.operators());
    assert!(!collector
        .event_types()
        .contains(&"SessionSaved".to_string()));

    // 重试走真实仓储即可成功
    wf.save(fx.sessions.as_ref()).await.unwrap();
    assert!(!wf.has_unsaved_changes());
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let fx = fixture();
    let config = BalancingConfig {
        save_timeout_ms: 20,
        ..BalancingConfig::default()
    };
    let mut wf = BalancingWorkflow::new(config, None);
    wf.select_product(fx.catalog.as_ref(), "P1", Some(1)).unwrap();

    let err = wf
        .save(&SlowGateway(Duration::from_millis(500)))
        .await
        .unwrap_err();
    match err {
        BalancingError::PersistenceFailure(msg) => assert!(msg.contains("20")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(wf.has_unsaved_changes());
}

#[tokio::test]
async fn test_save_times_out_while_connection_is_busy() {
    let (_db, path) = create_test_db().unwrap();
    let conn = open_shared_connection(&path).unwrap();
    let catalog = OperationCatalogRepository::from_connection(conn.clone());
    let sessions = BalancingSessionRepository::from_connection(conn.clone());
    catalog
        .replace_operations("P1", None, &tshirt_operations())
        .unwrap();

    let config = BalancingConfig {
        save_timeout_ms: 50,
        ..BalancingConfig::default()
    };
    let mut wf = BalancingWorkflow::new(config, None);
    wf.select_product(&catalog, "P1", Some(2)).unwrap();

    // 另一线程长时间占用连接
    let (locked_tx, locked_rx) = mpsc::channel();
    let holder = {
        let conn = conn.clone();
        std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(800));
        })
    };
    locked_rx.recv().unwrap();

    let started = Instant::now();
    let err = wf.save(&sessions).await.unwrap_err();
    let elapsed = started.elapsed();
    assert!(matches!(err, BalancingError::PersistenceFailure(_)));
    assert!(elapsed < Duration::from_millis(500), "elapsed={:?}", elapsed);
    assert!(wf.has_unsaved_changes());
    assert_eq!(wf.session_id(), None);

    holder.join().unwrap();

    // 超时放弃的保存不会在锁释放后补写
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sessions.list_sessions(None).unwrap().is_empty());

    let session_id = wf.save(&sessions).await.unwrap();
    assert_eq!(sessions.list_sessions(None).unwrap().len(), 1);
    assert_eq!(wf.session_id(), Some(session_id.as_str()));
}

#[tokio::test]
async fn test_edit_during_save_stays_dirty() {
    let fx = fixture();
    let mut wf = workflow();
    wf.select_product(fx.catalog.as_ref(), "P1", Some(2)).unwrap();
    wf.place(&PlacementIntent::new("O1", OperatorId(1)).with_units(10))
        .unwrap();

    let pending = wf.prepare_save().unwrap();
    wf.place(&PlacementIntent::new("O2", OperatorId(2)).with_units(10))
        .unwrap();

    let session_id = BalancingWorkflow::persist(
        fx.sessions.as_ref(),
        &pending,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    wf.complete_save(&pending, session_id).unwrap();

    assert!(wf.has_unsaved_changes());
}

#[tokio::test]
async fn test_atomic_replace_rolls_back_on_failure() {
    let fx = fixture();
    let mut wf = workflow();
    wf.select_product(fx.catalog.as_ref(), "P1", Some(2)).unwrap();
    wf.place(&PlacementIntent::new("O1", OperatorId(1)).with_units(30))
        .unwrap();
    wf.place(&PlacementIntent::new("O2", OperatorId(2)).with_units(20))
        .unwrap();
    let session_id = wf.save(fx.sessions.as_ref()).await.unwrap();

    // 构造一份会触发 CHECK 约束的快照（数量为 0）
    let mut broken = wf.prepare_save().unwrap().snapshot;
    broken.header.headcount = 9;
    broken.operators[1].assignments[0].assigned_units_per_hour = 0;

    let err = fx
        .sessions
        .save_snapshot(Some(&session_id), &broken)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::DatabaseQueryError(_)));

    // 经网关调用时折算为存储失败
    let err = fx
        .sessions
        .save_session(Some(&session_id), &broken)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Storage(_)));

    let saved = fx.sessions.get_saved_assignments(&session_id).unwrap();
    assert_eq!(saved.headcount, 2);
    assert_eq!(saved.operators.len(), 2);
    assert_eq!(saved.assignments.len(), 2);
    assert_eq!(saved.assignments[1].assigned_units_per_hour, 20);
}

#[tokio::test]
async fn test_degraded_data_blocks_save_by_default() {
    let mut ops = tshirt_operations();
    ops.push(Operation::new("O6", "终检", "QC", 0.0));
    let fx = fixture_with(&ops);

    let mut wf = workflow();
    wf.select_product(fx.catalog.as_ref(), "P1", Some(2)).unwrap();
    let err = wf.save(fx.sessions.as_ref()).await.unwrap_err();
    assert_eq!(
        err,
        BalancingError::DegradedOperationData {
            operation_ids: vec!["O6".to_string()]
        }
    );

    let config = BalancingConfig {
        block_save_on_degraded_data: false,
        ..BalancingConfig::default()
    };
    let mut lenient = BalancingWorkflow::new(config, None);
    lenient
        .select_product(fx.catalog.as_ref(), "P1", Some(2))
        .unwrap();
    lenient.save(fx.sessions.as_ref()).await.unwrap();
}

#[tokio::test]
async fn test_complete_save_after_session_replaced_is_rejected() {
    let fx = fixture();
    let mut wf = workflow();
    wf.select_product(fx.catalog.as_ref(), "P1", Some(1)).unwrap();

    let pending = wf.prepare_save().unwrap();
    wf.select_product(fx.catalog.as_ref(), "P1", Some(2)).unwrap();

    let session_id = BalancingWorkflow::persist(
        fx.sessions.as_ref(),
        &pending,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert!(matches!(
        wf.complete_save(&pending, session_id),
        Err(BalancingError::InvalidIntent(_))
    ));
    assert_eq!(wf.session_id(), None);
}
