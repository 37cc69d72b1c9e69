use chrono::Datelike;
use rust_decimal::Decimal;
use serial_test::serial;
use uuid::Uuid;

use axum_pos_api::{
    dto::{
        inventory::{AddStockRequest, DeductStockRequest},
        orders::{CreateOrderRequest, OrderItemRequest},
        reports::{DateQuery, DateRangeQuery, MonthQuery, StockUsageQuery},
    },
    models::{OrderType, PaymentMethod, PaymentStatus},
    services::{inventory_service, order_service, report_service},
};

mod common;

fn money(value: &str) -> Decimal {
    value.parse().unwrap()
}

fn order_request(
    product_id: Uuid,
    quantity: i32,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
) -> CreateOrderRequest {
    CreateOrderRequest {
        items: vec![OrderItemRequest {
            product_id,
            quantity,
            notes: None,
        }],
        order_type: OrderType::Takeaway,
        payment_method,
        payment_status: Some(payment_status),
        customer_name: None,
        customer_phone: None,
        discount_type: None,
        discount: None,
        tax: None,
        notes: None,
    }
}

#[tokio::test]
#[serial]
async fn daily_sales_report_splits_by_payment_status() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let cashier = common::create_user(&state, "cashier", "cashier").await?;
    let category = common::create_category(&state, "Waffles").await?;
    let paid = common::create_product(&state, "Choco Tsunami", category, "300").await?;
    let unpaid = common::create_product(&state, "Mango Tsunami", category, "200").await?;

    order_service::create_order(
        &state,
        &cashier,
        order_request(paid, 1, PaymentMethod::Cash, PaymentStatus::Completed),
    )
    .await?;
    order_service::create_order(
        &state,
        &cashier,
        order_request(unpaid, 1, PaymentMethod::Card, PaymentStatus::Pending),
    )
    .await?;

    let report = report_service::daily_sales(
        &state.pool,
        DateQuery {
            date: Some(chrono::Utc::now().date_naive()),
        },
    )
    .await?
    .data
    .unwrap();

    assert_eq!(report.summary.total_orders, 2);
    assert_eq!(report.summary.completed_orders, 1);
    assert_eq!(report.summary.pending_orders, 1);
    assert_eq!(report.summary.total_revenue, money("300"));
    assert_eq!(report.summary.average_order_value, Some(money("300")));

    // Breakdowns only count completed payments.
    assert_eq!(report.payment_breakdown.len(), 1);
    assert_eq!(report.payment_breakdown[0].payment_method, "cash");
    assert_eq!(report.payment_breakdown[0].total_amount, money("300"));
    assert_eq!(report.order_type_breakdown.len(), 1);
    assert_eq!(report.top_products.len(), 1);
    assert_eq!(report.top_products[0].product_name, "Choco Tsunami");

    Ok(())
}

#[tokio::test]
#[serial]
async fn profit_analysis_uses_recipe_costs() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let cashier = common::create_user(&state, "cashier", "cashier").await?;
    let category = common::create_category(&state, "Shakes").await?;
    let shake = common::create_product(&state, "Nutella Shake", category, "200").await?;
    let milk = common::create_inventory_item(&state, &admin, "Milk", "20", "0", "50").await?;
    common::add_recipe_line(&state, shake, milk, "1").await?;

    order_service::create_order(
        &state,
        &cashier,
        order_request(shake, 2, PaymentMethod::Cash, PaymentStatus::Completed),
    )
    .await?;

    let today = chrono::Utc::now().date_naive();
    let report = report_service::profit_analysis(
        &state.pool,
        DateRangeQuery {
            start_date: Some(today),
            end_date: Some(today),
        },
    )
    .await?
    .data
    .unwrap();

    // revenue 400, cost 2 * 1 * 50 = 100
    assert_eq!(report.summary.total_revenue, money("400"));
    assert_eq!(report.summary.total_cost, money("100"));
    assert_eq!(report.summary.total_profit, money("300"));
    assert_eq!(report.summary.profit_margin, money("75"));

    assert_eq!(report.orders.len(), 1);
    assert_eq!(report.orders[0].total_cost, money("100"));

    assert_eq!(report.daily_profit.len(), 1);
    assert_eq!(report.daily_profit[0].daily_profit, money("300"));

    let row = report
        .product_profit
        .iter()
        .find(|r| r.product_name == "Nutella Shake")
        .expect("product profit row");
    assert_eq!(row.total_quantity, 2);
    assert_eq!(row.total_revenue, money("400"));
    assert_eq!(row.total_cost, money("100"));
    assert_eq!(row.profit_margin, money("75"));

    Ok(())
}

#[tokio::test]
#[serial]
async fn profit_analysis_requires_a_range() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let err = report_service::profit_analysis(
        &state.pool,
        DateRangeQuery {
            start_date: None,
            end_date: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        axum_pos_api::error::AppError::BadRequest(_)
    ));

    Ok(())
}

#[tokio::test]
#[serial]
async fn monthly_report_rolls_up_categories() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let cashier = common::create_user(&state, "cashier", "cashier").await?;
    let category = common::create_category(&state, "Sundaes").await?;
    let sundae = common::create_product(&state, "Brownie Sundae", category, "180").await?;

    order_service::create_order(
        &state,
        &cashier,
        order_request(sundae, 3, PaymentMethod::Online, PaymentStatus::Completed),
    )
    .await?;

    let now = chrono::Utc::now().date_naive();
    let report = report_service::monthly(
        &state.pool,
        MonthQuery {
            year: Some(now.year()),
            month: Some(now.month()),
        },
    )
    .await?
    .data
    .unwrap();

    assert_eq!(report.monthly_summary.total_orders, 1);
    assert_eq!(report.monthly_summary.total_revenue, money("540"));
    assert_eq!(report.monthly_data.len(), 1);
    assert_eq!(report.monthly_data[0].daily_revenue, money("540"));

    assert_eq!(report.category_performance.len(), 1);
    assert_eq!(report.category_performance[0].category_name, "Sundaes");
    assert_eq!(report.category_performance[0].total_quantity, 3);

    assert_eq!(report.top_products.len(), 1);
    assert_eq!(report.top_products[0].average_price, Some(money("180")));

    Ok(())
}

#[tokio::test]
#[serial]
async fn stock_usage_report_totals_movements() -> anyhow::Result<()> {
    let state = match common::setup_state().await? {
        Some(state) => state,
        None => return Ok(()),
    };

    let admin = common::create_user(&state, "admin", "admin").await?;
    let item = common::create_inventory_item(&state, &admin, "Dark chocolate", "10", "0", "600")
        .await?;

    inventory_service::add_stock(
        &state,
        &admin,
        item,
        AddStockRequest {
            quantity: money("5"),
            unit_cost: None,
            notes: None,
        },
    )
    .await?;
    inventory_service::deduct_stock(
        &state,
        &admin,
        item,
        DeductStockRequest {
            quantity: money("3"),
            reason: None,
        },
    )
    .await?;

    let report = report_service::stock_usage(
        &state.pool,
        StockUsageQuery {
            start_date: None,
            end_date: None,
            category_id: None,
        },
    )
    .await?
    .data
    .unwrap();

    let row = report
        .stock_usage
        .iter()
        .find(|r| r.id == item)
        .expect("usage row");
    assert_eq!(row.total_stock_in, money("5"));
    assert_eq!(row.total_stock_out, money("3"));
    assert_eq!(row.net_stock_change, money("2"));
    assert_eq!(row.current_stock, money("12"));
    // 3 / (5 + 12) * 100
    assert_eq!(row.usage_percentage, money("17.65"));

    // One row per movement type today: initial, in, out.
    assert_eq!(report.daily_movement.len(), 3);

    Ok(())
}
