use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::inventory::{
        AddStockRequest, AdjustStockRequest, CreateInventoryItemRequest, DeductStockRequest,
        ExpiryAlertList, ExpiryQuery, InventoryItemWithTransactions, InventoryList,
        LowStockAlertList, StockTransactionList, TransactionQuery, UpdateInventoryItemRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::InventoryItem,
    response::ApiResponse,
    services::inventory_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items))
        .route("/", post(create_item))
        .route("/alerts/low-stock", get(low_stock_alerts))
        .route("/alerts/expiry", get(expiry_alerts))
        .route("/{id}", get(get_item))
        .route("/{id}", put(update_item))
        .route("/{id}/stock/add", post(add_stock))
        .route("/{id}/stock/deduct", post(deduct_stock))
        .route("/{id}/stock/adjust", post(adjust_stock))
        .route("/{id}/transactions", get(list_transactions))
}

#[utoipa::path(
    get,
    path = "/api/inventory",
    responses(
        (status = 200, description = "List inventory items", body = ApiResponse<InventoryList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<InventoryList>>> {
    let resp = inventory_service::list_items(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Item with recent transactions", body = ApiResponse<InventoryItemWithTransactions>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn get_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<InventoryItemWithTransactions>>> {
    let resp = inventory_service::get_item(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/inventory",
    request_body = CreateInventoryItemRequest,
    responses(
        (status = 200, description = "Item created", body = ApiResponse<InventoryItem>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateInventoryItemRequest>,
) -> AppResult<Json<ApiResponse<InventoryItem>>> {
    let resp = inventory_service::create_item(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/inventory/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = UpdateInventoryItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<InventoryItem>),
        (status = 404, description = "Not Found"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInventoryItemRequest>,
) -> AppResult<Json<ApiResponse<InventoryItem>>> {
    let resp = inventory_service::update_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/inventory/{id}/stock/add",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = AddStockRequest,
    responses(
        (status = 200, description = "Stock added", body = ApiResponse<InventoryItem>),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn add_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddStockRequest>,
) -> AppResult<Json<ApiResponse<InventoryItem>>> {
    let resp = inventory_service::add_stock(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/inventory/{id}/stock/deduct",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = DeductStockRequest,
    responses(
        (status = 200, description = "Stock deducted", body = ApiResponse<InventoryItem>),
        (status = 400, description = "Invalid or insufficient quantity"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn deduct_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeductStockRequest>,
) -> AppResult<Json<ApiResponse<InventoryItem>>> {
    let resp = inventory_service::deduct_stock(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/inventory/{id}/stock/adjust",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<InventoryItem>),
        (status = 400, description = "Invalid delta"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustStockRequest>,
) -> AppResult<Json<ApiResponse<InventoryItem>>> {
    let resp = inventory_service::adjust_stock(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inventory/{id}/transactions",
    params(
        ("id" = Uuid, Path, description = "Inventory item ID"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("type" = Option<String>, Query, description = "Filter by transaction type"),
    ),
    responses(
        (status = 200, description = "Ledger entries", body = ApiResponse<StockTransactionList>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<ApiResponse<StockTransactionList>>> {
    let resp = inventory_service::list_transactions(&state, &user, id, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inventory/alerts/low-stock",
    responses(
        (status = 200, description = "Items at or below minimum stock", body = ApiResponse<LowStockAlertList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn low_stock_alerts(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<LowStockAlertList>>> {
    let resp = inventory_service::low_stock_alerts(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inventory/alerts/expiry",
    params(("days" = Option<i64>, Query, description = "Horizon in days, default 30")),
    responses(
        (status = 200, description = "Items expiring within the horizon", body = ApiResponse<ExpiryAlertList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn expiry_alerts(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ExpiryQuery>,
) -> AppResult<Json<ApiResponse<ExpiryAlertList>>> {
    let resp = inventory_service::expiry_alerts(&state, &user, query).await?;
    Ok(Json(resp))
}
