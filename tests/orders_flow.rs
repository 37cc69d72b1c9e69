use rust_decimal::Decimal;
use serial_test::serial;
use uuid::Uuid;

use axum_pos_api::{
    dto::orders::{
        CreateOrderRequest, DailySummaryQuery, OrderItemRequest, UpdateOrderRequest,
    },
    error::AppError,
    models::{OrderType, PaymentMethod, PaymentStatus},
    services::order_service,
};

mod common;

fn money(value: &str) -> Decimal {
    value.parse().unwrap()
}

fn cart_request(items: Vec<OrderItemRequest>) -> CreateOrderRequest {
    CreateOrderRequest {
        items,
        order_type: OrderType::DineIn,
        payment_method: PaymentMethod::Cash,
        payment_status: None,
        customer_name: None,
        customer_phone: None,
        discount_type: None,
        discount: None,
        tax: None,
        notes: None,
    }
}

fn line(product_id: Uuid, quantity: i32) -> OrderItemRequest {
    OrderItemRequest {
        product_id,
        quantity,
        notes: None,
    }
}

// Create -> recipe deduction -> cancel -> restore, with totals recomputed
// from catalog prices.
#[tokio::test]
#[serial]
async fn create_and_cancel_order_moves_recipe_stock() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let cashier = common::create_user(&state, "cashier", "cashier").await?;

    let category = common::create_category(&state, "Waffles").await?;
    let choco = common::create_product(&state, "Choco Tsunami", category, "189").await?;
    let mango = common::create_product(&state, "Mango Tsunami", category, "199").await?;

    let batter = common::create_inventory_item(&state, &admin, "Waffle batter", "10", "2", "120")
        .await?;
    common::add_recipe_line(&state, choco, batter, "0.5").await?;
    common::add_recipe_line(&state, mango, batter, "0.25").await?;

    let resp = order_service::create_order(
        &state,
        &cashier,
        cart_request(vec![line(choco, 2), line(mango, 1)]),
    )
    .await?;
    let created = resp.data.unwrap();
    assert_eq!(created.total, money("577"));

    // 10 - (0.5 * 2 + 0.25 * 1)
    assert_eq!(common::current_stock(&state, batter).await?, money("8.75"));
    assert_eq!(common::ledger_balance(&state, batter).await?, money("8.75"));

    order_service::cancel_order(&state, &cashier, created.id).await?;
    assert_eq!(common::current_stock(&state, batter).await?, money("10"));
    assert_eq!(common::ledger_balance(&state, batter).await?, money("10"));

    // Cancellation is terminal, not idempotent.
    let err = order_service::cancel_order(&state, &cashier, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
#[serial]
async fn create_order_rejects_empty_and_unknown_carts() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let cashier = common::create_user(&state, "cashier", "cashier").await?;

    let err = order_service::create_order(&state, &cashier, cart_request(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::create_order(
        &state,
        &cashier,
        cart_request(vec![line(Uuid::new_v4(), 1)]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let orders: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(orders.0, 0);

    Ok(())
}

#[tokio::test]
#[serial]
async fn insufficient_ingredient_stock_aborts_whole_order() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let cashier = common::create_user(&state, "cashier", "cashier").await?;

    let category = common::create_category(&state, "Shakes").await?;
    let shake = common::create_product(&state, "Nutella Shake", category, "149").await?;
    let milk = common::create_inventory_item(&state, &admin, "Milk", "0.5", "0", "60").await?;
    common::add_recipe_line(&state, shake, milk, "0.3").await?;

    let err = order_service::create_order(&state, &cashier, cart_request(vec![line(shake, 2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // The transaction rolled back: no order, no items, stock untouched.
    let orders: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(orders.0, 0);
    assert_eq!(common::current_stock(&state, milk).await?, money("0.5"));
    assert_eq!(common::ledger_balance(&state, milk).await?, money("0.5"));

    Ok(())
}

#[tokio::test]
#[serial]
async fn old_orders_require_admin_to_update() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let cashier = common::create_user(&state, "cashier", "cashier").await?;

    let category = common::create_category(&state, "Sundaes").await?;
    let sundae = common::create_product(&state, "Brownie Sundae", category, "179").await?;

    let resp =
        order_service::create_order(&state, &cashier, cart_request(vec![line(sundae, 1)])).await?;
    let order_id = resp.data.unwrap().id;

    let patch = UpdateOrderRequest {
        order_type: None,
        customer_name: Some("Walk-in".to_string()),
        customer_phone: None,
        status: None,
        payment_method: None,
        payment_status: None,
        discount_type: None,
        discount: None,
        tax: None,
        notes: None,
    };

    // Fresh order: the cashier may edit it.
    order_service::update_order(&state, &cashier, order_id, patch).await?;

    // Age the order past the edit window.
    sqlx::query("UPDATE orders SET created_at = NOW() - INTERVAL '25 hours' WHERE id = $1")
        .bind(order_id)
        .execute(&state.pool)
        .await?;

    let patch = UpdateOrderRequest {
        order_type: None,
        customer_name: Some("Regular".to_string()),
        customer_phone: None,
        status: None,
        payment_method: None,
        payment_status: None,
        discount_type: None,
        discount: None,
        tax: None,
        notes: None,
    };
    let err = order_service::update_order(&state, &cashier, order_id, patch)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let patch = UpdateOrderRequest {
        order_type: None,
        customer_name: Some("Regular".to_string()),
        customer_phone: None,
        status: None,
        payment_method: None,
        payment_status: None,
        discount_type: None,
        discount: None,
        tax: None,
        notes: None,
    };
    order_service::update_order(&state, &admin, order_id, patch).await?;

    // Cancelled orders are terminal for updates too.
    order_service::cancel_order(&state, &admin, order_id).await?;
    let patch = UpdateOrderRequest {
        order_type: None,
        customer_name: Some("Too late".to_string()),
        customer_phone: None,
        status: None,
        payment_method: None,
        payment_status: None,
        discount_type: None,
        discount: None,
        tax: None,
        notes: None,
    };
    let err = order_service::update_order(&state, &admin, order_id, patch)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
#[serial]
async fn daily_summary_excludes_cancelled_orders() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let cashier = common::create_user(&state, "cashier", "cashier").await?;
    let category = common::create_category(&state, "Specials").await?;
    let big = common::create_product(&state, "Party Platter", category, "500").await?;
    let small = common::create_product(&state, "Mini Waffle", category, "300").await?;

    let mut request = cart_request(vec![line(big, 1)]);
    request.payment_status = Some(PaymentStatus::Completed);
    let cancelled = order_service::create_order(&state, &cashier, request)
        .await?
        .data
        .unwrap();

    let mut request = cart_request(vec![line(small, 1)]);
    request.payment_status = Some(PaymentStatus::Completed);
    order_service::create_order(&state, &cashier, request).await?;

    order_service::cancel_order(&state, &cashier, cancelled.id).await?;

    let resp = order_service::daily_summary(
        &state,
        DailySummaryQuery {
            date: Some(chrono::Utc::now().date_naive()),
        },
    )
    .await?;
    let summary = resp.data.unwrap();

    assert_eq!(summary.summary.total_orders, 1);
    assert_eq!(summary.summary.total_sales, money("300"));
    assert_eq!(summary.summary.cash_sales, money("300"));
    assert_eq!(summary.top_products.len(), 1);
    assert_eq!(summary.top_products[0].product_name, "Mini Waffle");

    Ok(())
}
