// ==========================================
// 生产线平衡引擎 - 命令行主入口
// ==========================================
// 用法:
//   line-balancing import <文件> <产品ID> [产品名称]
//   line-balancing products
//   line-balancing sessions [产品ID]
//   line-balancing show <会话ID>
//   line-balancing balance-demo <产品ID> <人数>
// ==========================================

use anyhow::{anyhow, bail, Context};
use line_balancing::api::BoardView;
use line_balancing::app::{get_default_db_path, AppState};
use std::path::Path;

const USAGE: &str = "用法:
  line-balancing import <文件> <产品ID> [产品名称]
  line-balancing products
  line-balancing sessions [产品ID]
  line-balancing show <会话ID>
  line-balancing balance-demo <产品ID> <人数>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    line_balancing::logging::init();

    tracing::info!("==================================================");
    tracing::info!("生产线平衡引擎 {}", line_balancing::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).await.map_err(|e| anyhow!(e))?;
    let api = state.balancing_api.clone();

    match (command.as_str(), &args[1..]) {
        ("import", [file, product_id, rest @ ..]) => {
            let summary = api.import_catalog(
                Path::new(file),
                product_id,
                rest.first().map(String::as_str),
            )?;
            print_json(&summary)?;
        }
        ("products", []) => print_json(&api.list_products()?)?,
        ("sessions", rest) => print_json(&api.list_sessions(rest.first().map(String::as_str))?)?,
        ("show", [session_id]) => {
            let board = api.open_session(session_id)?;
            print_board(&board);
        }
        ("balance-demo", [product_id, headcount]) => {
            let headcount: i64 = headcount
                .parse()
                .with_context(|| format!("人数格式错误: {}", headcount))?;

            let board = api.start_session(product_id, Some(headcount))?;

            // 演示: 按工序顺序轮流放到各操作员（非优化分配）
            let operator_ids: Vec<u32> = board.operators.iter().map(|o| o.operator_id).collect();
            let producible = board.pool.iter().filter(|p| !p.degraded);
            for (entry, operator_id) in producible.zip(operator_ids.iter().cycle()) {
                api.place_operation(&entry.operation_id, *operator_id, None)?;
            }

            let board = api.get_board()?;
            print_board(&board);

            let session_id = api.save_session().await?;
            println!("会话已保存: {}", session_id);
        }
        _ => bail!("无法识别的命令\n{}", USAGE),
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_board(board: &BoardView) {
    println!(
        "产品 {} | 人数 {} | 总标准工时 {:.2} 分 | 小时产量 {} | 节拍 {:.2} 分 | 设备需求 {:.2}",
        board.product_id,
        board.headcount,
        board.total_standard_time,
        board.units_per_hour,
        board.takt_time,
        board.required_machines
    );
    for operator in &board.operators {
        println!(
            "  [{}] {:<12} 占用 {:>7.2} 分  负荷 {:>6.1}%",
            operator.operator_id,
            operator.display_name,
            operator.occupied_minutes,
            operator.occupancy_percentage
        );
        for a in &operator.assignments {
            println!(
                "      - {} {} × {}/h",
                a.operation_id, a.operation_name, a.assigned_units_per_hour
            );
        }
    }
    let pending: Vec<String> = board
        .pool
        .iter()
        .filter(|p| p.pending_units_per_hour > 0)
        .map(|p| format!("{}({})", p.operation_id, p.pending_units_per_hour))
        .collect();
    if !pending.is_empty() {
        println!("  待分配: {}", pending.join(", "));
    }
    println!(
        "  平均负荷 {:.1}% | 平衡率 {:.1}%",
        board.summary.average_occupancy, board.summary.balance_efficiency
    );
}
