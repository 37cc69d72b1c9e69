#![allow(dead_code)]

use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, Statement};
use uuid::Uuid;

use axum_pos_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::inventory::CreateInventoryItemRequest,
    middleware::auth::AuthUser,
    services::inventory_service,
    state::AppState,
};

/// Build an AppState against the configured test database, or None to skip
/// when no database is available in the environment.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs.
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE stock_transactions, order_items, orders, product_recipes, \
         inventory_items, products, categories, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(Some(AppState { pool, orm }))
}

pub async fn create_user(state: &AppState, username: &str, role: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, password_hash, role) VALUES ($1, $2, 'dummy', $3)")
        .bind(id)
        .bind(username)
        .bind(role)
        .execute(&state.pool)
        .await?;

    Ok(AuthUser {
        user_id: id,
        username: username.to_string(),
        role: role.to_string(),
    })
}

pub async fn create_category(state: &AppState, name: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name, sort_order) VALUES ($1, $2, 0)")
        .bind(id)
        .bind(name)
        .execute(&state.pool)
        .await?;
    Ok(id)
}

pub async fn create_product(
    state: &AppState,
    name: &str,
    category_id: Uuid,
    price: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let price: Decimal = price.parse()?;
    sqlx::query(
        "INSERT INTO products (id, name, category_id, price, cost_price) VALUES ($1, $2, $3, $4, 0)",
    )
    .bind(id)
    .bind(name)
    .bind(category_id)
    .bind(price)
    .execute(&state.pool)
    .await?;
    Ok(id)
}

/// Create a ledger item through the service so the opening balance is recorded.
pub async fn create_inventory_item(
    state: &AppState,
    admin: &AuthUser,
    name: &str,
    stock: &str,
    min_level: &str,
    unit_cost: &str,
) -> anyhow::Result<Uuid> {
    let resp = inventory_service::create_item(
        state,
        admin,
        CreateInventoryItemRequest {
            name: name.to_string(),
            category_id: None,
            current_stock: stock.parse()?,
            min_stock_level: min_level.parse()?,
            max_stock_level: None,
            unit: Some("kg".to_string()),
            unit_cost: unit_cost.parse()?,
            unit_price: None,
            supplier_info: None,
            expiry_date: None,
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("create_item failed: {e}"))?;

    Ok(resp.data.ok_or_else(|| anyhow::anyhow!("no item data"))?.id)
}

pub async fn add_recipe_line(
    state: &AppState,
    product_id: Uuid,
    inventory_item_id: Uuid,
    quantity: &str,
) -> anyhow::Result<()> {
    let quantity: Decimal = quantity.parse()?;
    sqlx::query(
        "INSERT INTO product_recipes (id, product_id, inventory_item_id, quantity, unit) \
         VALUES ($1, $2, $3, $4, 'kg')",
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(inventory_item_id)
    .bind(quantity)
    .execute(&state.pool)
    .await?;
    Ok(())
}

pub async fn current_stock(state: &AppState, item_id: Uuid) -> anyhow::Result<Decimal> {
    let row: (Decimal,) = sqlx::query_as("SELECT current_stock FROM inventory_items WHERE id = $1")
        .bind(item_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(row.0)
}

/// Net ledger balance for an item: initial + in + signed adjustments − out.
pub async fn ledger_balance(state: &AppState, item_id: Uuid) -> anyhow::Result<Decimal> {
    let row: (Option<Decimal>,) = sqlx::query_as(
        r#"
        SELECT SUM(
            CASE WHEN transaction_type = 'stock_out' THEN -quantity ELSE quantity END
        )
        FROM stock_transactions
        WHERE inventory_item_id = $1
        "#,
    )
    .bind(item_id)
    .fetch_one(&state.pool)
    .await?;
    Ok(row.0.unwrap_or(Decimal::ZERO))
}
