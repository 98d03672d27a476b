// ==========================================
// 仓储库存系统 - 命令行主入口
// ==========================================
// 用法:
//   warehouse-inventory import <csv>     批次入库
//   warehouse-inventory export <csv>     提交出库请求并排空，输出台账
//   warehouse-inventory expiring [k]     最早过期的 k 个批次
//   warehouse-inventory alerts           临期预警
//   warehouse-inventory stock            全部在库批次（按过期时间升序）
// 数据库路径: WAREHOUSE_INVENTORY_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use warehouse_inventory::config::get_default_db_path;
use warehouse_inventory::{logging, InventoryApi};

const USAGE: &str = "用法: warehouse-inventory <import <csv> | export <csv> | expiring [k] | alerts | stock>";

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        bail!("{}", USAGE);
    };

    let db_path = get_default_db_path();
    tracing::info!("{} v{}，使用数据库: {}", warehouse_inventory::APP_NAME, warehouse_inventory::VERSION, db_path);
    let api = InventoryApi::open(&db_path).context("打开库存服务失败")?;

    match command.as_str() {
        "import" => {
            let path = next_path(&mut args)?;
            let summary = api
                .import_csv(&path)
                .with_context(|| format!("批次入库失败: {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "export" => {
            let path = next_path(&mut args)?;
            let (accepted, rejected) = api
                .submit_csv(&path)
                .await
                .with_context(|| format!("读取出库请求失败: {}", path.display()))?;
            for row in &rejected {
                tracing::warn!("第 {} 行未入队: {}", row.row, row.message);
            }
            tracing::info!("出库请求已入队: {}", accepted);

            let ledger = api.drain().await;
            println!("{}", serde_json::to_string_pretty(&ledger)?);
        }
        "expiring" => {
            let k = match args.next() {
                Some(raw) => raw
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("k 必须为非负整数: {}", raw))?,
                None => api.config().expiring_top_k,
            };
            let batches = api.expiring_batches(k)?;
            println!("{}", serde_json::to_string_pretty(&batches)?);
        }
        "alerts" => {
            let alerts = api.expiry_alerts(Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&alerts)?);
        }
        "stock" => {
            let batches = api.stock_by_expiry()?;
            println!("{}", serde_json::to_string_pretty(&batches)?);
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}

fn next_path(args: &mut impl Iterator<Item = String>) -> Result<PathBuf> {
    match args.next() {
        Some(path) => Ok(PathBuf::from(path)),
        None => bail!("缺少文件路径\n{}", USAGE),
    }
}
