// ==========================================
// BalancingStore + BalancingCalculator 集成测试
// ==========================================
// 测试目标:
// - 典型场景的指标数值
// - 产能不变量在任意变更序列后成立
// - 取消/重新分配幂等、钳制边界、人数缩减零损失
// ==========================================


use line_balancing::domain::{OperatorId, SavedAssignment, SavedOperator, SavedSession};
use line_balancing::engine::{BalancingCalculator, BalancingError, BalancingStore};
use test_helpers::{approx_eq, single_operation, tshirt_operations};

fn store_with(headcount: u32) -> BalancingStore {
    BalancingStore::initialize("P1", single_operation(), headcount, "Operator", None).unwrap()
}

fn pending(store: &BalancingStore, operation_id: &str) -> u32 {
    store.capacity(operation_id).unwrap().pending_units_per_hour()
}

// ==========================================
// 典型场景
// ==========================================

#[test]
fn test_scenario_a_header_metrics() {
    let store = store_with(2);
    let metrics = BalancingCalculator::new().compute(&store);

    assert!(approx_eq(metrics.total_standard_time, 1.0));
    assert_eq!(metrics.units_per_hour, 120);
    assert!(approx_eq(metrics.takt_time, 0.5));
    assert!(approx_eq(metrics.required_machines, 2.0));
    assert_eq!(store.capacity("O1").unwrap().total_units_per_hour, 60);
}

#[test]
fn test_scenario_b_partial_assignment() {
    let mut store = store_with(2);
    store.assign("O1", OperatorId(1), 30).unwrap();

    let metrics = BalancingCalculator::new().compute(&store);
    let load = metrics.load_of(OperatorId(1)).unwrap();
    assert!(approx_eq(load.occupied_minutes, 0.5));
    assert!(approx_eq(load.occupancy_percentage, 100.0));
    assert_eq!(pending(&store, "O1"), 30);
}

#[test]
fn test_scenario_c_request_is_clamped_to_pending() {
    let mut store = store_with(2);
    store.assign("O1", OperatorId(1), 30).unwrap();

    let assignment = store.assign("O1", OperatorId(2), 40).unwrap();
    assert_eq!(assignment.assigned_units_per_hour, 30);

    let metrics = BalancingCalculator::new().compute(&store);
    assert!(approx_eq(
        metrics.load_of(OperatorId(2)).unwrap().occupancy_percentage,
        100.0
    ));
    assert_eq!(pending(&store, "O1"), 0);
    store.check_invariants().unwrap();
}

#[test]
fn test_scenario_d_unassign_returns_capacity() {
    let mut store = store_with(2);
    let assignment = store.assign("O1", OperatorId(1), 30).unwrap();

    store.unassign(OperatorId(1), assignment.instance_id).unwrap();

    let metrics = BalancingCalculator::new().compute(&store);
    assert_eq!(pending(&store, "O1"), 60);
    assert!(approx_eq(metrics.load_of(OperatorId(1)).unwrap().occupied_minutes, 0.0));
}

// ==========================================
// 不变量
// ==========================================

#[test]
fn test_invariants_hold_after_mixed_mutations() {
    let mut store =
        BalancingStore::initialize("P1", tshirt_operations(), 3, "Operator", None).unwrap();

    let a1 = store.assign("O1", OperatorId(1), 50).unwrap();
    let a2 = store.assign("O1", OperatorId(2), 500).unwrap();
    let a3 = store.assign("O3", OperatorId(3), 10).unwrap();
    store.check_invariants().unwrap();

    store.reassign_quantity(OperatorId(3), a3.instance_id, 40).unwrap();
    store.unassign(OperatorId(1), a1.instance_id).unwrap();
    store.reassign_quantity(OperatorId(2), a2.instance_id, 20).unwrap();
    store.resize_headcount(2).unwrap();
    store.check_invariants().unwrap();

    for capacity in store.capacities() {
        let summed: u32 = store
            .assignments_for_operation(&capacity.operation_id)
            .map(|a| a.assigned_units_per_hour)
            .sum();
        assert_eq!(summed, capacity.assigned_units_per_hour);
        assert!(capacity.assigned_units_per_hour <= capacity.total_units_per_hour);
    }
}

#[test]
fn test_unassign_then_reassign_is_idempotent() {
    let mut store = store_with(2);
    let first = store.assign("O1", OperatorId(1), 25).unwrap();
    let before = store.capacity("O1").unwrap().clone();

    store.unassign(OperatorId(1), first.instance_id).unwrap();
    let second = store.assign("O1", OperatorId(1), 25).unwrap();

    assert_eq!(store.capacity("O1").unwrap(), &before);
    assert_ne!(first.instance_id, second.instance_id);
    assert_eq!(store.operator(OperatorId(1)).unwrap().assignments.len(), 1);
}

#[test]
fn test_assign_at_zero_pending_changes_nothing() {
    let mut store = store_with(2);
    store.assign("O1", OperatorId(1), 60).unwrap();
    let before = store.clone();

    let err = store.assign("O1", OperatorId(2), 1).unwrap_err();
    assert_eq!(
        err,
        BalancingError::NoCapacityRemaining {
            operation_id: "O1".to_string()
        }
    );
    assert_eq!(store.capacities(), before.capacities());
    assert_eq!(store.operators(), before.operators());
}

#[test]
fn test_reassign_beyond_pending_is_rejected() {
    let mut store = store_with(2);
    let a = store.assign("O1", OperatorId(1), 50).unwrap();

    let err = store
        .reassign_quantity(OperatorId(1), a.instance_id, 61)
        .unwrap_err();
    assert!(matches!(
        err,
        BalancingError::CapacityExceeded {
            requested_delta: 11,
            pending: 10,
            ..
        }
    ));
    assert_eq!(store.capacity("O1").unwrap().assigned_units_per_hour, 50);

    // 恰好用完剩余产能是允许的
    store.reassign_quantity(OperatorId(1), a.instance_id, 60).unwrap();
    assert_eq!(pending(&store, "O1"), 0);
}

#[test]
fn test_shrinking_headcount_loses_no_capacity() {
    let mut store =
        BalancingStore::initialize("P1", tshirt_operations(), 4, "Operator", None).unwrap();
    store.assign("O2", OperatorId(1), 20).unwrap();
    store.assign("O2", OperatorId(3), 15).unwrap();
    store.assign("O4", OperatorId(4), 30).unwrap();

    let pending_before: u64 = store
        .capacities()
        .iter()
        .map(|c| c.pending_units_per_hour() as u64)
        .sum();
    let released = store.resize_headcount(2).unwrap();
    let released_units: u64 = released.iter().map(|a| a.assigned_units_per_hour as u64).sum();
    let pending_after: u64 = store
        .capacities()
        .iter()
        .map(|c| c.pending_units_per_hour() as u64)
        .sum();

    assert_eq!(released.len(), 2);
    assert_eq!(pending_after, pending_before + released_units);
    assert_eq!(store.headcount(), 2);
    assert_eq!(store.operators()[0].assignments.len(), 1);
    store.check_invariants().unwrap();
}

#[test]
fn test_growing_headcount_keeps_existing_slots() {
    let mut store = store_with(2);
    store.rename_operator(OperatorId(2), "李四").unwrap();
    store.assign("O1", OperatorId(2), 10).unwrap();

    store.resize_headcount(1).unwrap();
    let released = store.resize_headcount(3).unwrap();
    assert!(released.is_empty());

    let ids: Vec<u32> = store.operators().iter().map(|o| o.operator_id.0).collect();
    // 被移除的 ID 不复用
    assert_eq!(ids, vec![1, 3, 4]);
    assert_eq!(store.operators()[2].display_name, "Operator 3");
    assert!(store.operators()[1].assignments.is_empty());
}

// ==========================================
// 编辑模式回放
// ==========================================

fn saved_session(assignments: Vec<SavedAssignment>) -> SavedSession {
    SavedSession {
        session_id: "S1".to_string(),
        product_id: "P1".to_string(),
        headcount: 2,
        operators: vec![
            SavedOperator {
                operator_id: OperatorId(1),
                display_name: "张三".to_string(),
            },
            SavedOperator {
                operator_id: OperatorId(2),
                display_name: "李四".to_string(),
            },
        ],
        assignments,
    }
}

#[test]
fn test_replay_restores_names_and_capacity() {
    let saved = saved_session(vec![
        SavedAssignment {
            operator_id: OperatorId(1),
            operation_id: "O1".to_string(),
            assigned_units_per_hour: 30,
        },
        SavedAssignment {
            operator_id: OperatorId(2),
            operation_id: "O1".to_string(),
            assigned_units_per_hour: 20,
        },
    ]);

    let store =
        BalancingStore::initialize("P1", single_operation(), 2, "Operator", Some(&saved)).unwrap();

    assert_eq!(store.operators()[1].display_name, "李四");
    assert_eq!(pending(&store, "O1"), 10);
    store.check_invariants().unwrap();
}

#[test]
fn test_replay_over_capacity_is_rejected() {
    let saved = saved_session(vec![
        SavedAssignment {
            operator_id: OperatorId(1),
            operation_id: "O1".to_string(),
            assigned_units_per_hour: 50,
        },
        SavedAssignment {
            operator_id: OperatorId(2),
            operation_id: "O1".to_string(),
            assigned_units_per_hour: 20,
        },
    ]);

    let err = BalancingStore::initialize("P1", single_operation(), 2, "Operator", Some(&saved))
        .unwrap_err();
    assert!(matches!(err, BalancingError::InvalidSavedSession(_)));
}

#[test]
fn test_degraded_operation_is_visible_but_excluded() {
    let mut ops = single_operation();
    ops.push(line_balancing::domain::Operation::new("O2", "检验", "QC", 0.0));

    let mut store = BalancingStore::initialize("P1", ops, 2, "Operator", None).unwrap();
    assert_eq!(store.degraded_operations(), vec!["O2".to_string()]);
    assert_eq!(store.capacity("O2").unwrap().total_units_per_hour, 0);
    assert!(matches!(
        store.assign("O2", OperatorId(1), 1),
        Err(BalancingError::DegradedOperationData { .. })
    ));

    let metrics = BalancingCalculator::new().compute(&store);
    assert!(approx_eq(metrics.total_standard_time, 1.0));
    assert!(metrics.has_degraded_data());
}

#[test]
fn test_oversized_sam_is_degraded_not_exhausted() {
    // 60 / 150 取整为 0 件/小时
    let mut ops = single_operation();
    ops.push(line_balancing::domain::Operation::new("O2", "手工绣花", "EMB", 150.0));

    let mut store = BalancingStore::initialize("P1", ops, 2, "Operator", None).unwrap();
    assert_eq!(store.capacity("O2").unwrap().total_units_per_hour, 0);
    assert_eq!(store.degraded_operations(), vec!["O2".to_string()]);

    let err = store.assign("O2", OperatorId(1), 10).unwrap_err();
    assert_eq!(
        err,
        BalancingError::DegradedOperationData {
            operation_ids: vec!["O2".to_string()]
        }
    );
    assert!(store.operators().iter().all(|o| o.assignments.is_empty()));

    // 表头指标与未分配工时口径一致: 都不计入 O2
    let metrics = BalancingCalculator::new().compute(&store);
    assert!(metrics.has_degraded_data());
    assert!(approx_eq(metrics.total_standard_time, 1.0));
    assert!(approx_eq(metrics.unassigned_minutes, 1.0));
    assert_eq!(metrics.units_per_hour, 120);
    assert!(approx_eq(metrics.required_machines, 2.0));
}

#[test]
fn test_workload_summary_tie_break_lowest_id() {
    let mut store = store_with(3);
    store.assign("O1", OperatorId(2), 20).unwrap();
    store.assign("O1", OperatorId(3), 20).unwrap();

    let summary = BalancingCalculator::new().compute(&store).summary;
    assert_eq!(summary.most_loaded, Some(OperatorId(2)));
    assert_eq!(summary.least_loaded, Some(OperatorId(1)));
}
