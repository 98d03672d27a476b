// ==========================================
// 出库分配端到端测试
// ==========================================
// 测试目标: SQLite 持久化下的 入库 → 提交 → 排空 → 台账/出库单 流程
// ==========================================


use test_helpers::{create_test_db, jan, new_batch};
use warehouse_inventory::domain::{Consumption, FailureKind, RequestOutcome};
use warehouse_inventory::logging;
use warehouse_inventory::{ApiError, ExportRequest, InventoryApi};

/// 入库两批次: id=1 (qty 5, 01-10), id=2 (qty 3, 01-05)
fn seed_two_batches(api: &InventoryApi) {
    let first = api.import_batch(new_batch(1, 5, jan(10)), Some("ACME")).unwrap();
    let second = api.import_batch(new_batch(1, 3, jan(5)), Some("ACME")).unwrap();
    assert_eq!((first.id, second.id), (1, 2));
}

// ==========================================
// 测试用例
// ==========================================

#[tokio::test]
async fn test_full_fulfillment_consumes_earliest_first() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let api = InventoryApi::open(&db_path).unwrap();
    seed_two_batches(&api);

    assert_eq!(api.submit(ExportRequest::new(1, 6)).await.unwrap(), 1);
    let ledger = api.drain().await;

    assert_eq!(ledger.len(), 1);
    let result = ledger[0].result().expect("应为成功条目");
    assert_eq!(
        result.consumed,
        vec![
            Consumption { batch_id: 2, quantity: 3 },
            Consumption { batch_id: 1, quantity: 3 },
        ]
    );
    assert_eq!(result.remaining_unfulfilled, 0);

    assert_eq!(api.get_batch(1).unwrap().quantity, 2);
    assert_eq!(api.get_batch(2).unwrap().quantity, 0);
}

#[tokio::test]
async fn test_shortfall_keeps_partial_writes() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let api = InventoryApi::open(&db_path).unwrap();
    seed_two_batches(&api);

    api.submit(ExportRequest::new(1, 10)).await.unwrap();
    let ledger = api.drain().await;

    assert!(ledger[0].is_success());
    assert_eq!(ledger[0].shortfall(), Some(2));
    assert_eq!(
        ledger[0].result().unwrap().consumed,
        vec![
            Consumption { batch_id: 2, quantity: 3 },
            Consumption { batch_id: 1, quantity: 5 },
        ]
    );

    // 数量归零的批次保留，但不再作为候选
    assert_eq!(api.get_batch(1).unwrap().quantity, 0);
    assert_eq!(api.get_batch(2).unwrap().quantity, 0);
    assert!(api.expiring_batches(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_out_of_stock_then_success_in_order() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let api = InventoryApi::open(&db_path).unwrap();
    seed_two_batches(&api);

    api.submit(ExportRequest::new(99, 1)).await.unwrap();
    api.submit(ExportRequest::new(1, 4)).await.unwrap();
    let ledger = api.drain().await;

    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[0].request.product_id, 99);
    assert_eq!(ledger[0].failure_kind(), Some(FailureKind::OutOfStock));
    assert!(ledger[1].is_success());
    assert_eq!(ledger[1].shortfall(), Some(0));

    assert_eq!(api.get_batch(2).unwrap().quantity, 0);
    assert_eq!(api.get_batch(1).unwrap().quantity, 4);
}

#[tokio::test]
async fn test_export_receipt_recorded_for_success() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let api = InventoryApi::open(&db_path).unwrap();
    seed_two_batches(&api);

    let request = ExportRequest::new(1, 6).with_customer("C-001");
    api.submit(request.clone()).await.unwrap();
    let ledger = api.drain().await;

    let receipt_id = match &ledger[0].outcome {
        RequestOutcome::Success { receipt_id, .. } => receipt_id.expect("应记录出库单"),
        other => panic!("unexpected outcome: {:?}", other),
    };

    let receipt = api.export_receipt(receipt_id).unwrap();
    assert_eq!(receipt.request_id, request.request_id);
    assert_eq!(receipt.customer.as_deref(), Some("C-001"));
    assert_eq!(receipt.details, ledger[0].result().unwrap().consumed);
    assert_eq!(receipt.total_quantity(), 6);
}

#[tokio::test]
async fn test_invalid_quantity_never_enqueued() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let api = InventoryApi::open(&db_path).unwrap();

    for quantity in [0, -3] {
        let err = api.submit(ExportRequest::new(1, quantity)).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidQuantity { .. }));
    }
    assert_eq!(api.pending_count().await, 0);
    assert!(api.drain().await.is_empty());
}

#[tokio::test]
async fn test_ledger_serializes_with_status_tag() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let api = InventoryApi::open(&db_path).unwrap();
    seed_two_batches(&api);

    api.submit(ExportRequest::new(7, 1)).await.unwrap();
    api.submit(ExportRequest::new(1, 1)).await.unwrap();
    let ledger = api.drain().await;

    let json = serde_json::to_value(&ledger).unwrap();
    assert_eq!(json[0]["status"], "failed");
    assert_eq!(json[0]["kind"], "OUT_OF_STOCK");
    assert_eq!(json[1]["status"], "success");
    assert_eq!(json[1]["result"]["remaining_unfulfilled"], 0);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    {
        let api = InventoryApi::open(&db_path).unwrap();
        seed_two_batches(&api);
        api.submit(ExportRequest::new(1, 4)).await.unwrap();
        api.drain().await;
    }

    let api = InventoryApi::open(&db_path).unwrap();
    let remaining: Vec<(i64, i64)> = api
        .expiring_batches(10)
        .unwrap()
        .iter()
        .map(|b| (b.id, b.quantity))
        .collect();
    assert_eq!(remaining, vec![(1, 4)]);
    // 请求队列为内存结构，不跨实例保留
    assert_eq!(api.pending_count().await, 0);
}
