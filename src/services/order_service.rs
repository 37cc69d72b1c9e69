use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CreateOrderRequest, CreateOrderResponse, DailySummary, DailySummaryQuery,
        DailySummaryTotals, OrderList, OrderListQuery, OrderWithItems, TopProduct,
        UpdateOrderRequest,
    },
    entity::{
        inventory_items::{ActiveModel as ItemActive, Entity as InventoryItems},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Entity as Orders},
        product_recipes::{Column as RecipeCol, Entity as ProductRecipes, Model as RecipeModel},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{DiscountType, Order, OrderItem, OrderStatus, round_money},
    response::{ApiResponse, Meta},
    services::inventory_service::append_transaction,
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let orders: Vec<Order> = sqlx::query_as(
        r#"
        SELECT o.*, u.username AS created_by_username
        FROM orders o
        LEFT JOIN users u ON o.created_by = u.id
        WHERE ($1::text IS NULL OR o.status = $1)
          AND ($2::text IS NULL OR o.payment_method = $2)
          AND ($3::date IS NULL OR o.created_at::date >= $3)
          AND ($4::date IS NULL OR o.created_at::date <= $4)
        ORDER BY o.created_at DESC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(query.status.map(|s| s.as_str()))
    .bind(query.payment_method.map(|m| m.as_str()))
    .bind(query.start_date)
    .bind(query.end_date)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items: Vec<OrderItem> = sqlx::query_as(
        "SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY created_at",
    )
    .bind(&ids)
    .fetch_all(&state.pool)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    let items = orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect();

    Ok(ApiResponse::success("Orders", OrderList { items }, None))
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderWithItems>> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        SELECT o.*, u.username AS created_by_username
        FROM orders o
        LEFT JOIN users u ON o.created_by = u.id
        WHERE o.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at")
            .bind(id)
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "Order",
        OrderWithItems { order, items },
        None,
    ))
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<CreateOrderResponse>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must contain at least one item".into(),
        ));
    }
    for line in &payload.items {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(
                "Item quantities must be positive".into(),
            ));
        }
    }

    let txn = state.orm.begin().await?;

    // Client-submitted prices are ignored; the catalog is the price authority.
    let mut subtotal = Decimal::ZERO;
    let mut priced_lines = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let product = Products::find_by_id(line.product_id).one(&txn).await?;
        let product = match product {
            Some(p) => p,
            None => {
                return Err(AppError::BadRequest(format!(
                    "Product {} not found",
                    line.product_id
                )));
            }
        };
        if !product.is_available {
            return Err(AppError::BadRequest(format!(
                "Product {} is not available",
                product.name
            )));
        }
        let line_total = round_money(product.price * Decimal::from(line.quantity));
        subtotal += line_total;
        priced_lines.push((line, product, line_total));
    }

    let totals = compute_totals(subtotal, payload.discount_type, payload.discount, payload.tax)?;

    let order_id = Uuid::new_v4();
    let order_number = build_order_number();

    OrderActive {
        id: Set(order_id),
        order_number: Set(order_number.clone()),
        order_type: Set(payload.order_type.as_str().to_string()),
        customer_name: Set(payload.customer_name),
        customer_phone: Set(payload.customer_phone),
        subtotal: Set(subtotal),
        discount_amount: Set(totals.discount_amount),
        discount_type: Set(payload.discount_type.map(|d| d.as_str().to_string())),
        tax_amount: Set(totals.tax_amount),
        total_amount: Set(totals.total),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        payment_status: Set(payload
            .payment_status
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| "pending".to_string())),
        status: Set("pending".to_string()),
        notes: Set(payload.notes),
        created_by: Set(Some(user.user_id)),
        updated_by: NotSet,
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for (line, product, line_total) in &priced_lines {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product.id),
            product_name: Set(product.name.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(product.price),
            total_price: Set(*line_total),
            notes: Set(line.notes.clone()),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    let quantities: Vec<(Uuid, i32)> = priced_lines
        .iter()
        .map(|(line, product, _)| (product.id, line.quantity))
        .collect();
    let requirements = recipe_requirements(&txn, &quantities).await?;
    deduct_for_order(&txn, requirements, &order_number).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id, "order_number": order_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created successfully",
        CreateOrderResponse {
            id: order_id,
            order_number,
            total: totals.total,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if existing.status == "cancelled" {
        return Err(AppError::BadRequest(
            "Cancelled orders cannot be modified".into(),
        ));
    }

    let age = Utc::now().signed_duration_since(existing.created_at.with_timezone(&Utc));
    if age > Duration::hours(24) && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can edit orders older than 24 hours".into(),
        ));
    }

    if payload.status == Some(OrderStatus::Cancelled) {
        return Err(AppError::BadRequest(
            "Orders are cancelled through the cancel endpoint".into(),
        ));
    }
    if payload.discount_type.is_some() && payload.discount.is_none() {
        return Err(AppError::BadRequest(
            "A discount value is required when changing the discount type".into(),
        ));
    }

    let subtotal = existing.subtotal;
    let recompute = payload.discount.is_some() || payload.tax.is_some();

    let mut discount_amount = existing.discount_amount;
    let mut discount_type = existing.discount_type.clone();
    if let Some(value) = payload.discount {
        let dt = payload
            .discount_type
            .or_else(|| existing.discount_type.as_deref().and_then(DiscountType::from_db))
            .unwrap_or(DiscountType::Flat);
        discount_amount = compute_discount_amount(subtotal, dt, value)?;
        discount_type = Some(dt.as_str().to_string());
    }

    let tax_amount = match payload.tax {
        Some(tax) if tax < Decimal::ZERO => {
            return Err(AppError::BadRequest("Tax must not be negative".into()));
        }
        Some(tax) => tax,
        None => existing.tax_amount,
    };

    let mut active: OrderActive = existing.into();
    if let Some(order_type) = payload.order_type {
        active.order_type = Set(order_type.as_str().to_string());
    }
    if let Some(customer_name) = payload.customer_name {
        active.customer_name = Set(Some(customer_name));
    }
    if let Some(customer_phone) = payload.customer_phone {
        active.customer_phone = Set(Some(customer_phone));
    }
    if let Some(status) = payload.status {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(payment_method) = payload.payment_method {
        active.payment_method = Set(payment_method.as_str().to_string());
    }
    if let Some(payment_status) = payload.payment_status {
        active.payment_status = Set(payment_status.as_str().to_string());
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    if recompute {
        active.discount_amount = Set(discount_amount);
        active.discount_type = Set(discount_type);
        active.tax_amount = Set(tax_amount);
        active.total_amount = Set(subtotal - discount_amount + tax_amount);
    }
    active.updated_by = Set(Some(user.user_id));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::message_only("Order updated successfully"))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    // Cancellation is terminal and not idempotent.
    if order.status == "cancelled" {
        return Err(AppError::BadRequest("Order is already cancelled".into()));
    }

    let order_number = order.order_number.clone();

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(id))
        .all(&txn)
        .await?;

    let mut active: OrderActive = order.into();
    active.status = Set("cancelled".to_string());
    active.updated_by = Set(Some(user.user_id));
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    let quantities: Vec<(Uuid, i32)> = items
        .iter()
        .map(|item| (item.product_id, item.quantity))
        .collect();
    let requirements = recipe_requirements(&txn, &quantities).await?;
    restore_for_order(&txn, requirements, &order_number).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id, "order_number": order_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::message_only("Order cancelled successfully"))
}

pub async fn daily_summary(
    state: &AppState,
    query: DailySummaryQuery,
) -> AppResult<ApiResponse<DailySummary>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let summary: DailySummaryTotals = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS total_orders,
            COALESCE(SUM(total_amount), 0) AS total_sales,
            COALESCE(SUM(CASE WHEN payment_method = 'cash' THEN total_amount ELSE 0 END), 0) AS cash_sales,
            COALESCE(SUM(CASE WHEN payment_method = 'card' THEN total_amount ELSE 0 END), 0) AS card_sales,
            COALESCE(SUM(CASE WHEN payment_method = 'online' THEN total_amount ELSE 0 END), 0) AS online_sales,
            COALESCE(SUM(discount_amount), 0) AS total_discounts,
            COALESCE(SUM(tax_amount), 0) AS total_tax
        FROM orders
        WHERE created_at::date = $1 AND status <> 'cancelled'
        "#,
    )
    .bind(date)
    .fetch_one(&state.pool)
    .await?;

    let top_products: Vec<TopProduct> = sqlx::query_as(
        r#"
        SELECT
            oi.product_id,
            oi.product_name,
            SUM(oi.quantity) AS total_quantity,
            COALESCE(SUM(oi.total_price), 0) AS total_revenue
        FROM order_items oi
        JOIN orders o ON oi.order_id = o.id
        WHERE o.created_at::date = $1 AND o.status <> 'cancelled'
        GROUP BY oi.product_id, oi.product_name
        ORDER BY total_quantity DESC
        LIMIT 10
        "#,
    )
    .bind(date)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Daily summary",
        DailySummary {
            date,
            summary,
            top_products,
        },
        None,
    ))
}

#[derive(Debug)]
pub(crate) struct OrderTotals {
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// The one authoritative totals formula: total = subtotal − discount + tax.
pub(crate) fn compute_totals(
    subtotal: Decimal,
    discount_type: Option<DiscountType>,
    discount: Option<Decimal>,
    tax: Option<Decimal>,
) -> AppResult<OrderTotals> {
    let discount_amount = match discount {
        Some(value) => {
            compute_discount_amount(subtotal, discount_type.unwrap_or(DiscountType::Flat), value)?
        }
        None => Decimal::ZERO,
    };

    let tax_amount = tax.unwrap_or(Decimal::ZERO);
    if tax_amount < Decimal::ZERO {
        return Err(AppError::BadRequest("Tax must not be negative".into()));
    }

    Ok(OrderTotals {
        discount_amount,
        tax_amount,
        total: subtotal - discount_amount + tax_amount,
    })
}

fn compute_discount_amount(
    subtotal: Decimal,
    discount_type: DiscountType,
    value: Decimal,
) -> AppResult<Decimal> {
    if value < Decimal::ZERO {
        return Err(AppError::BadRequest("Discount must not be negative".into()));
    }
    let amount = match discount_type {
        DiscountType::Percentage => {
            if value > Decimal::from(100) {
                return Err(AppError::BadRequest(
                    "Discount percentage cannot exceed 100".into(),
                ));
            }
            round_money(subtotal * value / Decimal::from(100))
        }
        DiscountType::Flat => value,
    };
    if amount > subtotal {
        return Err(AppError::BadRequest(
            "Discount cannot exceed the subtotal".into(),
        ));
    }
    Ok(amount)
}

fn build_order_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORD-{}-{}", date, &suffix[..8])
}

/// Aggregate recipe consumption per inventory item for the given product
/// quantities. BTreeMap keeps lock acquisition in a deterministic order.
async fn recipe_requirements<C: ConnectionTrait>(
    conn: &C,
    quantities: &[(Uuid, i32)],
) -> AppResult<BTreeMap<Uuid, Decimal>> {
    let product_ids: Vec<Uuid> = quantities.iter().map(|(id, _)| *id).collect();
    let recipes: Vec<RecipeModel> = ProductRecipes::find()
        .filter(RecipeCol::ProductId.is_in(product_ids))
        .all(conn)
        .await?;

    let mut by_product: HashMap<Uuid, Vec<&RecipeModel>> = HashMap::new();
    for recipe in &recipes {
        by_product.entry(recipe.product_id).or_default().push(recipe);
    }

    let mut requirements: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for (product_id, quantity) in quantities {
        if let Some(lines) = by_product.get(product_id) {
            for line in lines {
                *requirements.entry(line.inventory_item_id).or_default() +=
                    line.quantity * Decimal::from(*quantity);
            }
        }
    }

    Ok(requirements)
}

async fn deduct_for_order<C: ConnectionTrait>(
    conn: &C,
    requirements: BTreeMap<Uuid, Decimal>,
    order_number: &str,
) -> AppResult<()> {
    for (item_id, quantity) in requirements {
        let item = InventoryItems::find_by_id(item_id)
            .lock(LockType::Update)
            .one(conn)
            .await?;
        let item = match item {
            Some(i) => i,
            None => {
                return Err(AppError::BadRequest(format!(
                    "Inventory item {item_id} not found"
                )));
            }
        };

        if item.current_stock < quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock of {}",
                item.name
            )));
        }

        let cost = item.unit_cost;
        let new_stock = item.current_stock - quantity;
        let mut active: ItemActive = item.into();
        active.current_stock = Set(new_stock);
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await?;

        append_transaction(
            conn,
            item_id,
            crate::models::StockTransactionType::StockOut,
            quantity,
            cost,
            format!("Order {order_number}"),
        )
        .await?;
    }
    Ok(())
}

async fn restore_for_order<C: ConnectionTrait>(
    conn: &C,
    requirements: BTreeMap<Uuid, Decimal>,
    order_number: &str,
) -> AppResult<()> {
    for (item_id, quantity) in requirements {
        let item = InventoryItems::find_by_id(item_id)
            .lock(LockType::Update)
            .one(conn)
            .await?;
        // An ingredient removed from the catalog after the sale just stays gone.
        let item = match item {
            Some(i) => i,
            None => continue,
        };

        let cost = item.unit_cost;
        let new_stock = item.current_stock + quantity;
        let mut active: ItemActive = item.into();
        active.current_stock = Set(new_stock);
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await?;

        append_transaction(
            conn,
            item_id,
            crate::models::StockTransactionType::StockIn,
            quantity,
            cost,
            format!("Order {order_number} cancelled"),
        )
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn totals_use_server_prices_only() {
        // 189 * 2 + 199 * 1, no discount, no tax.
        let subtotal = money("189") * Decimal::from(2) + money("199");
        let totals = compute_totals(subtotal, None, None, None).unwrap();
        assert_eq!(totals.total, money("577"));
        assert_eq!(totals.discount_amount, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::ZERO);
    }

    #[test]
    fn flat_discount_and_tax() {
        let totals = compute_totals(
            money("500"),
            Some(DiscountType::Flat),
            Some(money("50")),
            Some(money("25")),
        )
        .unwrap();
        assert_eq!(totals.discount_amount, money("50"));
        assert_eq!(totals.total, money("475"));
    }

    #[test]
    fn percentage_discount_rounds_half_away_from_zero() {
        let totals = compute_totals(
            money("199"),
            Some(DiscountType::Percentage),
            Some(money("12.5")),
            None,
        )
        .unwrap();
        // 199 * 0.125 = 24.875 -> 24.88
        assert_eq!(totals.discount_amount, money("24.88"));
        assert_eq!(totals.total, money("174.12"));
    }

    #[test]
    fn percentage_above_hundred_is_rejected() {
        let err = compute_totals(
            money("100"),
            Some(DiscountType::Percentage),
            Some(money("101")),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn flat_discount_above_subtotal_is_rejected() {
        let err = compute_totals(
            money("100"),
            Some(DiscountType::Flat),
            Some(money("150")),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn negative_tax_is_rejected() {
        let err = compute_totals(money("100"), None, None, Some(money("-1"))).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn order_numbers_are_dated_and_unique_enough() {
        let a = build_order_number();
        let b = build_order_number();
        assert!(a.starts_with("ORD-"));
        assert_eq!(a.len(), "ORD-".len() + 8 + 1 + 8);
        assert_ne!(a, b);
    }
}
