use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::inventory::{
        AddStockRequest, AdjustStockRequest, CreateInventoryItemRequest, DeductStockRequest,
        ExpiryAlert, ExpiryAlertList, ExpiryQuery, InventoryItemWithTransactions, InventoryList,
        LowStockAlert, LowStockAlertList, StockTransactionList, TransactionQuery,
        UpdateInventoryItemRequest,
    },
    entity::{
        inventory_items::{ActiveModel as ItemActive, Entity as InventoryItems},
        stock_transactions::ActiveModel as StockTxnActive,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_staff},
    models::{InventoryItem, StockTransaction, StockTransactionType, round_money},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

const ITEM_WITH_CATEGORY: &str = r#"
    SELECT
        i.*,
        c.name AS category_name,
        c.color AS category_color
    FROM inventory_items i
    LEFT JOIN categories c ON i.category_id = c.id
"#;

pub async fn list_items(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<InventoryList>> {
    ensure_staff(user)?;
    let sql = format!("{ITEM_WITH_CATEGORY} ORDER BY i.name ASC");
    let items: Vec<InventoryItem> = sqlx::query_as(&sql).fetch_all(&state.pool).await?;

    Ok(ApiResponse::success(
        "Inventory items",
        InventoryList { items },
        None,
    ))
}

pub async fn get_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<InventoryItemWithTransactions>> {
    ensure_staff(user)?;
    let item = fetch_item(state, id).await?;

    let transactions: Vec<StockTransaction> = sqlx::query_as(
        r#"
        SELECT * FROM stock_transactions
        WHERE inventory_item_id = $1
        ORDER BY created_at DESC
        LIMIT 10
        "#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Inventory item",
        InventoryItemWithTransactions { item, transactions },
        None,
    ))
}

pub async fn create_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateInventoryItemRequest,
) -> AppResult<ApiResponse<InventoryItem>> {
    ensure_admin(user)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Item name is required".into()));
    }
    if payload.current_stock < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "Current stock must not be negative".into(),
        ));
    }
    if payload.unit_cost < Decimal::ZERO {
        return Err(AppError::BadRequest("Unit cost must not be negative".into()));
    }

    let duplicate: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM inventory_items WHERE name = $1")
            .bind(payload.name.as_str())
            .fetch_optional(&state.pool)
            .await?;
    if duplicate.is_some() {
        return Err(AppError::BadRequest(
            "An inventory item with this name already exists".into(),
        ));
    }

    let id = Uuid::new_v4();
    let txn = state.orm.begin().await?;

    ItemActive {
        id: Set(id),
        name: Set(payload.name),
        category_id: Set(payload.category_id),
        current_stock: Set(payload.current_stock),
        min_stock_level: Set(payload.min_stock_level),
        max_stock_level: Set(payload.max_stock_level),
        unit: Set(payload.unit.unwrap_or_else(|| "unit".to_string())),
        unit_cost: Set(payload.unit_cost),
        unit_price: Set(payload.unit_price),
        supplier_info: Set(payload.supplier_info),
        expiry_date: Set(payload.expiry_date),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    // Opening balance goes through the ledger like everything else.
    if payload.current_stock > Decimal::ZERO {
        append_transaction(
            &txn,
            id,
            StockTransactionType::InitialStock,
            payload.current_stock,
            payload.unit_cost,
            "Initial stock entry".to_string(),
        )
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "inventory_item_create",
        Some("inventory_items"),
        Some(serde_json::json!({ "inventory_item_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let item = fetch_item(state, id).await?;
    Ok(ApiResponse::success(
        "Inventory item created",
        item,
        Some(Meta::empty()),
    ))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateInventoryItemRequest,
) -> AppResult<ApiResponse<InventoryItem>> {
    ensure_admin(user)?;

    let existing = InventoryItems::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    if let Some(name) = payload.name.as_ref() {
        let duplicate: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM inventory_items WHERE name = $1 AND id <> $2")
                .bind(name.as_str())
                .bind(id)
                .fetch_optional(&state.pool)
                .await?;
        if duplicate.is_some() {
            return Err(AppError::BadRequest(
                "An inventory item with this name already exists".into(),
            ));
        }
    }

    // current_stock is deliberately absent here: the ledger is the only
    // writer of stock levels.
    let mut active: ItemActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(Some(category_id));
    }
    if let Some(min_stock_level) = payload.min_stock_level {
        active.min_stock_level = Set(min_stock_level);
    }
    if let Some(max_stock_level) = payload.max_stock_level {
        active.max_stock_level = Set(Some(max_stock_level));
    }
    if let Some(unit) = payload.unit {
        active.unit = Set(unit);
    }
    if let Some(unit_cost) = payload.unit_cost {
        if unit_cost < Decimal::ZERO {
            return Err(AppError::BadRequest("Unit cost must not be negative".into()));
        }
        active.unit_cost = Set(unit_cost);
    }
    if let Some(unit_price) = payload.unit_price {
        active.unit_price = Set(Some(unit_price));
    }
    if let Some(supplier_info) = payload.supplier_info {
        active.supplier_info = Set(Some(supplier_info));
    }
    if let Some(expiry_date) = payload.expiry_date {
        active.expiry_date = Set(Some(expiry_date));
    }
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(&state.orm).await?;

    let item = fetch_item(state, id).await?;
    Ok(ApiResponse::success(
        "Inventory item updated",
        item,
        Some(Meta::empty()),
    ))
}

pub async fn add_stock(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AddStockRequest,
) -> AppResult<ApiResponse<InventoryItem>> {
    ensure_staff(user)?;
    if payload.quantity <= Decimal::ZERO {
        return Err(AppError::BadRequest("A positive quantity is required".into()));
    }

    let txn = state.orm.begin().await?;

    let item = InventoryItems::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let cost = payload.unit_cost.unwrap_or(item.unit_cost);
    let new_stock = item.current_stock + payload.quantity;

    let mut active: ItemActive = item.into();
    active.current_stock = Set(new_stock);
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(&txn).await?;

    append_transaction(
        &txn,
        id,
        StockTransactionType::StockIn,
        payload.quantity,
        cost,
        payload
            .notes
            .unwrap_or_else(|| "Manual stock addition".to_string()),
    )
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "stock_add",
        Some("inventory_items"),
        Some(serde_json::json!({ "inventory_item_id": id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let item = fetch_item(state, id).await?;
    Ok(ApiResponse::success(
        "Stock added",
        item,
        Some(Meta::empty()),
    ))
}

pub async fn deduct_stock(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: DeductStockRequest,
) -> AppResult<ApiResponse<InventoryItem>> {
    ensure_staff(user)?;
    if payload.quantity <= Decimal::ZERO {
        return Err(AppError::BadRequest("A positive quantity is required".into()));
    }

    let txn = state.orm.begin().await?;

    let item = InventoryItems::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    if item.current_stock < payload.quantity {
        return Err(AppError::BadRequest("Insufficient stock".into()));
    }

    let cost = item.unit_cost;
    let new_stock = item.current_stock - payload.quantity;

    let mut active: ItemActive = item.into();
    active.current_stock = Set(new_stock);
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(&txn).await?;

    append_transaction(
        &txn,
        id,
        StockTransactionType::StockOut,
        payload.quantity,
        cost,
        payload
            .reason
            .unwrap_or_else(|| "Manual stock deduction".to_string()),
    )
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "stock_deduct",
        Some("inventory_items"),
        Some(serde_json::json!({ "inventory_item_id": id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let item = fetch_item(state, id).await?;
    Ok(ApiResponse::success(
        "Stock deducted",
        item,
        Some(Meta::empty()),
    ))
}

/// Signed admin correction for counts that drifted from reality.
pub async fn adjust_stock(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AdjustStockRequest,
) -> AppResult<ApiResponse<InventoryItem>> {
    ensure_admin(user)?;

    if payload.delta == Decimal::ZERO {
        return Err(AppError::BadRequest("Delta must not be zero".into()));
    }

    let txn = state.orm.begin().await?;

    let item = InventoryItems::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let item = match item {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let new_stock = item.current_stock + payload.delta;
    if new_stock < Decimal::ZERO {
        return Err(AppError::BadRequest("Stock cannot go negative".into()));
    }

    let cost = item.unit_cost;
    let delta = payload.delta;

    let mut active: ItemActive = item.into();
    active.current_stock = Set(new_stock);
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(&txn).await?;

    // Adjustments keep their sign so the ledger always sums to current_stock.
    append_transaction(
        &txn,
        id,
        StockTransactionType::Adjustment,
        delta,
        cost,
        payload
            .notes
            .unwrap_or_else(|| "Manual stock adjustment".to_string()),
    )
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "stock_adjust",
        Some("inventory_items"),
        Some(serde_json::json!({ "inventory_item_id": id, "delta": delta })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let item = fetch_item(state, id).await?;
    Ok(ApiResponse::success(
        "Stock adjusted",
        item,
        Some(Meta::empty()),
    ))
}

pub async fn list_transactions(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    query: TransactionQuery,
) -> AppResult<ApiResponse<StockTransactionList>> {
    ensure_staff(user)?;
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM inventory_items WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    let pagination = Pagination {
        page: query.page,
        per_page: query.per_page,
    };
    let (page, per_page, offset) = pagination.normalize();
    let txn_type = query.transaction_type.map(|t| t.as_str());

    let transactions: Vec<StockTransaction> = sqlx::query_as(
        r#"
        SELECT * FROM stock_transactions
        WHERE inventory_item_id = $1
          AND ($2::text IS NULL OR transaction_type = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(id)
    .bind(txn_type)
    .bind(per_page)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM stock_transactions
        WHERE inventory_item_id = $1
          AND ($2::text IS NULL OR transaction_type = $2)
        "#,
    )
    .bind(id)
    .bind(txn_type)
    .fetch_one(&state.pool)
    .await?;

    let meta = Meta::new(page, per_page, total.0);
    Ok(ApiResponse::success(
        "Stock transactions",
        StockTransactionList { transactions },
        Some(meta),
    ))
}

pub async fn low_stock_alerts(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<LowStockAlertList>> {
    ensure_staff(user)?;
    let items: Vec<LowStockAlert> = sqlx::query_as(
        r#"
        SELECT
            i.*,
            c.name AS category_name,
            c.color AS category_color,
            (i.min_stock_level - i.current_stock) AS stock_needed
        FROM inventory_items i
        LEFT JOIN categories c ON i.category_id = c.id
        WHERE i.current_stock <= i.min_stock_level
        ORDER BY (i.min_stock_level - i.current_stock) DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Low stock alerts",
        LowStockAlertList { items },
        None,
    ))
}

pub async fn expiry_alerts(
    state: &AppState,
    user: &AuthUser,
    query: ExpiryQuery,
) -> AppResult<ApiResponse<ExpiryAlertList>> {
    ensure_staff(user)?;
    let days = query.days.unwrap_or(30);
    if days < 0 {
        return Err(AppError::BadRequest("Days must not be negative".into()));
    }
    let horizon = chrono::Utc::now().date_naive() + chrono::Days::new(days as u64);

    let items: Vec<ExpiryAlert> = sqlx::query_as(
        r#"
        SELECT
            i.*,
            c.name AS category_name,
            c.color AS category_color,
            (i.expiry_date - CURRENT_DATE) AS days_until_expiry
        FROM inventory_items i
        LEFT JOIN categories c ON i.category_id = c.id
        WHERE i.expiry_date IS NOT NULL
          AND i.expiry_date <= $1
          AND i.current_stock > 0
        ORDER BY i.expiry_date ASC
        "#,
    )
    .bind(horizon)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Expiry alerts",
        ExpiryAlertList { items },
        None,
    ))
}

async fn fetch_item(state: &AppState, id: Uuid) -> AppResult<InventoryItem> {
    let sql = format!("{ITEM_WITH_CATEGORY} WHERE i.id = $1");
    let item: Option<InventoryItem> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    match item {
        Some(i) => Ok(i),
        None => Err(AppError::NotFound),
    }
}

/// Append one ledger row. Callers update `current_stock` by the same delta
/// inside the same transaction.
pub(crate) async fn append_transaction<C: ConnectionTrait>(
    conn: &C,
    inventory_item_id: Uuid,
    transaction_type: StockTransactionType,
    quantity: Decimal,
    unit_cost: Decimal,
    notes: String,
) -> AppResult<()> {
    StockTxnActive {
        id: Set(Uuid::new_v4()),
        inventory_item_id: Set(inventory_item_id),
        transaction_type: Set(transaction_type.as_str().to_string()),
        quantity: Set(quantity),
        unit_cost: Set(unit_cost),
        total_cost: Set(round_money(quantity * unit_cost)),
        notes: Set(Some(notes)),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(())
}
