use rust_decimal::Decimal;
use serial_test::serial;

use axum_pos_api::{
    dto::inventory::{
        AddStockRequest, AdjustStockRequest, CreateInventoryItemRequest, DeductStockRequest,
        ExpiryQuery,
    },
    error::AppError,
    services::inventory_service,
};

mod common;

fn money(value: &str) -> Decimal {
    value.parse().unwrap()
}

#[tokio::test]
#[serial]
async fn ledger_and_cached_stock_move_together() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let item = common::create_inventory_item(&state, &admin, "Dark chocolate", "5", "0", "600")
        .await?;

    inventory_service::add_stock(
        &state,
        &admin,
        item,
        AddStockRequest {
            quantity: money("10"),
            unit_cost: Some(money("580")),
            notes: Some("Restock".to_string()),
        },
    )
    .await?;
    assert_eq!(common::current_stock(&state, item).await?, money("15"));

    inventory_service::deduct_stock(
        &state,
        &admin,
        item,
        DeductStockRequest {
            quantity: money("3"),
            reason: Some("Spoilage".to_string()),
        },
    )
    .await?;
    assert_eq!(common::current_stock(&state, item).await?, money("12"));

    // Over-deduction is rejected and leaves nothing behind.
    let err = inventory_service::deduct_stock(
        &state,
        &admin,
        item,
        DeductStockRequest {
            quantity: money("100"),
            reason: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(common::current_stock(&state, item).await?, money("12"));

    // current_stock always equals the net sum of the ledger.
    assert_eq!(common::ledger_balance(&state, item).await?, money("12"));

    let transactions: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM stock_transactions WHERE inventory_item_id = $1")
            .bind(item)
            .fetch_one(&state.pool)
            .await?;
    // initial + in + out, nothing for the rejected deduction
    assert_eq!(transactions.0, 3);

    Ok(())
}

#[tokio::test]
#[serial]
async fn non_positive_quantities_are_rejected() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let item = common::create_inventory_item(&state, &admin, "Milk", "5", "0", "60").await?;

    let err = inventory_service::add_stock(
        &state,
        &admin,
        item,
        AddStockRequest {
            quantity: money("0"),
            unit_cost: None,
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = inventory_service::deduct_stock(
        &state,
        &admin,
        item,
        DeductStockRequest {
            quantity: money("-1"),
            reason: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
#[serial]
async fn low_stock_alert_appears_and_clears() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let item = common::create_inventory_item(&state, &admin, "Mango pulp", "5", "10", "250")
        .await?;

    let alerts = inventory_service::low_stock_alerts(&state, &admin).await?.data.unwrap();
    let alert = alerts
        .items
        .iter()
        .find(|a| a.item.id == item)
        .expect("item below minimum should alert");
    assert_eq!(alert.stock_needed, money("5"));

    inventory_service::add_stock(
        &state,
        &admin,
        item,
        AddStockRequest {
            quantity: money("10"),
            unit_cost: None,
            notes: None,
        },
    )
    .await?;

    let alerts = inventory_service::low_stock_alerts(&state, &admin).await?.data.unwrap();
    assert!(alerts.items.iter().all(|a| a.item.id != item));

    Ok(())
}

#[tokio::test]
#[serial]
async fn expiry_alerts_respect_horizon_and_stock() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let soon = chrono::Utc::now().date_naive() + chrono::Days::new(10);

    let stocked = inventory_service::create_item(
        &state,
        &admin,
        CreateInventoryItemRequest {
            name: "Cream".to_string(),
            category_id: None,
            current_stock: money("4"),
            min_stock_level: money("0"),
            max_stock_level: None,
            unit: Some("l".to_string()),
            unit_cost: money("90"),
            unit_price: None,
            supplier_info: None,
            expiry_date: Some(soon),
        },
    )
    .await?
    .data
    .unwrap()
    .id;

    let empty = inventory_service::create_item(
        &state,
        &admin,
        CreateInventoryItemRequest {
            name: "Old syrup".to_string(),
            category_id: None,
            current_stock: money("0"),
            min_stock_level: money("0"),
            max_stock_level: None,
            unit: Some("l".to_string()),
            unit_cost: money("40"),
            unit_price: None,
            supplier_info: None,
            expiry_date: Some(soon),
        },
    )
    .await?
    .data
    .unwrap()
    .id;

    let alerts = inventory_service::expiry_alerts(&state, &admin, ExpiryQuery { days: Some(30) })
        .await?
        .data
        .unwrap();
    assert!(alerts.items.iter().any(|a| a.item.id == stocked));
    // Nothing left to spoil.
    assert!(alerts.items.iter().all(|a| a.item.id != empty));

    let alerts = inventory_service::expiry_alerts(&state, &admin, ExpiryQuery { days: Some(5) })
        .await?
        .data
        .unwrap();
    assert!(alerts.items.iter().all(|a| a.item.id != stocked));

    Ok(())
}

#[tokio::test]
#[serial]
async fn adjustments_are_admin_only_and_signed() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let cashier = common::create_user(&state, "cashier", "cashier").await?;
    let item = common::create_inventory_item(&state, &admin, "Waffle batter", "10", "0", "120")
        .await?;

    let err = inventory_service::adjust_stock(
        &state,
        &cashier,
        item,
        AdjustStockRequest {
            delta: money("-2"),
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    inventory_service::adjust_stock(
        &state,
        &admin,
        item,
        AdjustStockRequest {
            delta: money("-2"),
            notes: Some("Stocktake correction".to_string()),
        },
    )
    .await?;
    assert_eq!(common::current_stock(&state, item).await?, money("8"));
    assert_eq!(common::ledger_balance(&state, item).await?, money("8"));

    // Stock may never go negative, not even by admin correction.
    let err = inventory_service::adjust_stock(
        &state,
        &admin,
        item,
        AdjustStockRequest {
            delta: money("-50"),
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
#[serial]
async fn duplicate_item_names_are_rejected() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    common::create_inventory_item(&state, &admin, "Milk", "5", "0", "60").await?;

    let err = inventory_service::create_item(
        &state,
        &admin,
        CreateInventoryItemRequest {
            name: "Milk".to_string(),
            category_id: None,
            current_stock: money("1"),
            min_stock_level: money("0"),
            max_stock_level: None,
            unit: None,
            unit_cost: money("60"),
            unit_price: None,
            supplier_info: None,
            expiry_date: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}
