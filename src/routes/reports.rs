use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::reports::{
        DailySalesReport, DateQuery, DateRangeQuery, MonthQuery, MonthlyReport, ProfitAnalysis,
        StockUsageQuery, StockUsageReport,
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_staff},
    response::ApiResponse,
    services::report_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/daily-sales", get(daily_sales))
        .route("/monthly", get(monthly))
        .route("/profit-analysis", get(profit_analysis))
        .route("/stock-usage", get(stock_usage))
}

#[utoipa::path(
    get,
    path = "/api/reports/daily-sales",
    params(("date" = Option<String>, Query, description = "Calendar day (YYYY-MM-DD), default today")),
    responses(
        (status = 200, description = "Daily sales report", body = ApiResponse<DailySalesReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn daily_sales(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateQuery>,
) -> AppResult<Json<ApiResponse<DailySalesReport>>> {
    ensure_staff(&user)?;
    let resp = report_service::daily_sales(&state.pool, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/monthly",
    params(
        ("year" = Option<i32>, Query, description = "Calendar year, default current"),
        ("month" = Option<u32>, Query, description = "Month 1-12, default current"),
    ),
    responses(
        (status = 200, description = "Monthly report with category rollups", body = ApiResponse<MonthlyReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn monthly(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<ApiResponse<MonthlyReport>>> {
    ensure_staff(&user)?;
    let resp = report_service::monthly(&state.pool, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/profit-analysis",
    params(
        ("start_date" = String, Query, description = "Range start (YYYY-MM-DD)"),
        ("end_date" = String, Query, description = "Range end (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Profit analysis", body = ApiResponse<ProfitAnalysis>),
        (status = 400, description = "Missing date range")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn profit_analysis(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<ProfitAnalysis>>> {
    ensure_staff(&user)?;
    let resp = report_service::profit_analysis(&state.pool, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/stock-usage",
    params(
        ("start_date" = Option<String>, Query, description = "Range start (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Range end (YYYY-MM-DD)"),
        ("category_id" = Option<Uuid>, Query, description = "Filter by category"),
    ),
    responses(
        (status = 200, description = "Stock usage report", body = ApiResponse<StockUsageReport>)
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn stock_usage(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StockUsageQuery>,
) -> AppResult<Json<ApiResponse<StockUsageReport>>> {
    ensure_staff(&user)?;
    let resp = report_service::stock_usage(&state.pool, query).await?;
    Ok(Json(resp))
}
