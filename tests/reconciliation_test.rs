use assert_matches::assert_matches;
use chrono::NaiveDate;
use labtrack_api::{
    db::{create_db_pool, run_migrations},
    errors::ServiceError,
    events::{Event, EventSender},
    inventory::{Aliquot, StorageEntry, TransactionKind, Unit},
    services::materials::{CreateMaterialRequest, MaterialService},
    services::stock_transactions::{RecordTransactionRequest, StockTransactionService},
};
use std::{env, sync::Arc};
use tokio::sync::mpsc;
use uuid::Uuid;

fn entry(location: &str, aliquots: Vec<Aliquot>) -> StorageEntry {
    StorageEntry::new(location, aliquots)
}

fn create_request(name: &str, entries: Vec<StorageEntry>, volume: f64) -> CreateMaterialRequest {
    CreateMaterialRequest {
        name: name.to_string(),
        project: "IMM-12".to_string(),
        lot_number: "LOT-2291".to_string(),
        storage_entries: entries,
        concentration: Some("2 mg/mL".to_string()),
        submission_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
        storage_condition: "-80C".to_string(),
        submitted_volume: volume,
        unit: Unit::Milliliters,
        retain_amount: 5.0,
        retain_unit: Unit::Milliliters,
        label_info: None,
        notes: None,
    }
}

fn record_request(
    material_id: Uuid,
    kind: TransactionKind,
    quantity: f64,
    recipient: Option<&str>,
    entries: Vec<StorageEntry>,
) -> RecordTransactionRequest {
    RecordTransactionRequest {
        material_id,
        kind,
        quantity,
        unit: Unit::Milliliters,
        occurred_on: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
        recipient: recipient.map(str::to_string),
        storage_entries: entries,
        notes: None,
    }
}

fn drain(rx: &mut mpsc::Receiver<Event>) {
    while rx.try_recv().is_ok() {}
}

#[tokio::test]
async fn transaction_reconciliation_end_to_end() {
    env::set_var("APP__DATABASE_URL", "sqlite::memory:?cache=shared");

    // Setup database connection
    let db_pool = Arc::new(create_db_pool().await.expect("Failed to create DB pool"));
    run_migrations(db_pool.as_ref())
        .await
        .expect("Failed to run migrations");

    // Setup event sender
    let (tx, mut rx) = mpsc::channel(100);
    let event_sender = Arc::new(EventSender::new(tx));

    let materials = MaterialService::new(db_pool.clone(), Some(event_sender.clone()));
    let transactions = StockTransactionService::new(db_pool.clone(), Some(event_sender.clone()));

    // Step 1: Register a material with an initial storage layout
    println!("=== Registering material with 10 x 5 mL at F81 ===");
    let material = materials
        .create_material(create_request(
            "Anti-CD3 Antibody",
            vec![entry("F81", vec![Aliquot::new(10.0, 5.0, Unit::Milliliters)])],
            50.0,
        ))
        .await
        .expect("Failed to create material");

    assert_eq!(material.current_quantity, 50.0);
    assert_matches!(rx.try_recv(), Ok(Event::MaterialCreated(id)) if id == material.id);

    // Step 2: Addition at a known location merges into the matching aliquot
    println!("=== Addition of 2 x 5 mL at F81 ===");
    let addition = transactions
        .record_transaction(record_request(
            material.id,
            TransactionKind::Addition,
            10.0,
            None,
            vec![entry("F81", vec![Aliquot::new(2.0, 5.0, Unit::Milliliters)])],
        ))
        .await
        .expect("Failed to record addition");
    assert_eq!(addition.quantity, 10.0);

    assert_matches!(
        rx.try_recv(),
        Ok(Event::TransactionRecorded { material_id, kind: TransactionKind::Addition, .. })
            if material_id == material.id
    );
    assert_matches!(
        rx.try_recv(),
        Ok(Event::MaterialQuantityChanged { previous_quantity, new_quantity, .. })
            if previous_quantity == 50.0 && new_quantity == 60.0
    );

    let refreshed = materials.get_material(material.id).await.unwrap();
    assert_eq!(refreshed.current_quantity, 60.0);
    assert_eq!(refreshed.storage_entries[0].aliquots[0].count, 12.0);

    // Step 3: Consumption at an unknown location is ignored
    println!("=== Consumption against an unknown location ===");
    transactions
        .record_transaction(record_request(
            material.id,
            TransactionKind::Consumption,
            5.0,
            Some("Dana"),
            vec![entry(
                "Freezer 9",
                vec![Aliquot::new(1.0, 5.0, Unit::Milliliters)],
            )],
        ))
        .await
        .expect("Failed to record unmatched consumption");
    drain(&mut rx);

    let refreshed = materials.get_material(material.id).await.unwrap();
    assert_eq!(refreshed.current_quantity, 60.0);
    assert_eq!(refreshed.storage_entries.len(), 1);

    // Step 4: Consumption at a known location decrements the aliquot
    println!("=== Consumption of 4 x 5 mL at F81 ===");
    let consumption = transactions
        .record_transaction(record_request(
            material.id,
            TransactionKind::Consumption,
            20.0,
            Some("Miguel"),
            vec![entry("F81", vec![Aliquot::new(4.0, 5.0, Unit::Milliliters)])],
        ))
        .await
        .expect("Failed to record consumption");
    drain(&mut rx);

    let refreshed = materials.get_material(material.id).await.unwrap();
    assert_eq!(refreshed.current_quantity, 40.0);
    assert_eq!(refreshed.storage_entries[0].aliquots[0].count, 8.0);

    // Step 5: Consumption without a recipient is rejected
    println!("=== Consumption without a recipient is rejected ===");
    let err = transactions
        .record_transaction(record_request(
            material.id,
            TransactionKind::Consumption,
            5.0,
            None,
            vec![entry("F81", vec![Aliquot::new(1.0, 5.0, Unit::Milliliters)])],
        ))
        .await
        .expect_err("Consumption without recipient must fail");
    assert_matches!(err, ServiceError::ValidationError(_));

    let refreshed = materials.get_material(material.id).await.unwrap();
    assert_eq!(refreshed.current_quantity, 40.0);

    // Step 6: Deleting the consumption restores the counts
    println!("=== Deleting the consumption restores 60 mL ===");
    transactions
        .delete_transaction(consumption.id)
        .await
        .expect("Failed to delete consumption");
    assert_matches!(
        rx.try_recv(),
        Ok(Event::TransactionReversed { transaction_id, .. }) if transaction_id == consumption.id
    );
    assert_matches!(
        rx.try_recv(),
        Ok(Event::MaterialQuantityChanged { previous_quantity, new_quantity, .. })
            if previous_quantity == 40.0 && new_quantity == 60.0
    );

    let refreshed = materials.get_material(material.id).await.unwrap();
    assert_eq!(refreshed.current_quantity, 60.0);
    assert_eq!(refreshed.storage_entries[0].aliquots[0].count, 12.0);

    // Step 7: Adjustment pins the quantity without touching counts
    println!("=== Adjustment to 42 mL ===");
    let adjustment = transactions
        .record_transaction(record_request(
            material.id,
            TransactionKind::Adjustment,
            42.0,
            None,
            vec![],
        ))
        .await
        .expect("Failed to record adjustment");
    assert_eq!(adjustment.quantity, 42.0);
    drain(&mut rx);

    let refreshed = materials.get_material(material.id).await.unwrap();
    assert_eq!(refreshed.current_quantity, 42.0);
    assert_eq!(refreshed.storage_entries[0].aliquots[0].count, 12.0);

    // Step 8: Deleting the adjustment recomputes from the layout
    println!("=== Deleting the adjustment re-aggregates to 60 mL ===");
    transactions
        .delete_transaction(adjustment.id)
        .await
        .expect("Failed to delete adjustment");
    drain(&mut rx);

    let refreshed = materials.get_material(material.id).await.unwrap();
    assert_eq!(refreshed.current_quantity, 60.0);

    // Step 9: Addition at a new location creates the entry
    println!("=== Addition of 3 x 10 mL at Shelf 2 ===");
    let shelf_addition = transactions
        .record_transaction(record_request(
            material.id,
            TransactionKind::Addition,
            30.0,
            None,
            vec![entry(
                "Shelf 2",
                vec![Aliquot::new(3.0, 10.0, Unit::Milliliters)],
            )],
        ))
        .await
        .expect("Failed to record addition at new location");
    drain(&mut rx);

    let refreshed = materials.get_material(material.id).await.unwrap();
    assert_eq!(refreshed.current_quantity, 90.0);
    assert_eq!(refreshed.storage_entries.len(), 2);
    assert_eq!(refreshed.storage_entries[1].location, "Shelf 2");

    // Step 10: Reversing it zeroes the count but keeps the entry
    println!("=== Deleting the Shelf 2 addition ===");
    transactions
        .delete_transaction(shelf_addition.id)
        .await
        .expect("Failed to delete addition");
    drain(&mut rx);

    let refreshed = materials.get_material(material.id).await.unwrap();
    assert_eq!(refreshed.current_quantity, 60.0);
    assert_eq!(refreshed.storage_entries.len(), 2);
    assert_eq!(refreshed.storage_entries[1].aliquots[0].count, 0.0);

    // Step 11: Remaining history survives in the CSV export
    println!("=== CSV export of the transaction log ===");
    let csv = transactions.export_csv().await.expect("Failed to export CSV");
    assert!(csv.starts_with(
        "\"Date\",\"Material\",\"Lot Number\",\"Type\",\"Quantity\",\"Unit\",\"Recipient\",\"Aliquots\",\"Recorded At\",\"Notes\""
    ));
    assert!(csv.contains("\"Anti-CD3 Antibody\""));
    assert!(csv.contains("\"Dana\""));
    assert!(csv.contains("2 x 5 mL"));

    let list = transactions
        .list_transactions(1, 20, Some(material.id))
        .await
        .expect("Failed to list transactions");
    assert_eq!(list.total, 2);

    // Step 12: Transactions outlive their material
    println!("=== Orphaned transactions can still be deleted ===");
    let orphan_host = materials
        .create_material(create_request("Buffer Stock", vec![], 10.0))
        .await
        .expect("Failed to create second material");
    let orphan_txn = transactions
        .record_transaction(record_request(
            orphan_host.id,
            TransactionKind::Adjustment,
            25.0,
            None,
            vec![],
        ))
        .await
        .expect("Failed to record adjustment");
    drain(&mut rx);

    materials
        .delete_material(orphan_host.id)
        .await
        .expect("Failed to delete material");
    assert_matches!(rx.try_recv(), Ok(Event::MaterialDeleted(id)) if id == orphan_host.id);

    transactions
        .delete_transaction(orphan_txn.id)
        .await
        .expect("Orphaned transaction delete must succeed");
    assert_matches!(
        rx.try_recv(),
        Ok(Event::TransactionReversed { transaction_id, .. }) if transaction_id == orphan_txn.id
    );

    let err = transactions
        .get_transaction(orphan_txn.id)
        .await
        .expect_err("Deleted transaction must be gone");
    assert_matches!(err, ServiceError::NotFound(_));

    let err = materials
        .get_material(orphan_host.id)
        .await
        .expect_err("Deleted material must be gone");
    assert_matches!(err, ServiceError::NotFound(_));

    println!("=== Reconciliation flow completed ===");
}
