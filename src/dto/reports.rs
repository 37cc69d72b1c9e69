use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockUsageQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

/// One calendar day of orders, split by payment status.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DailySalesSummary {
    pub total_orders: i64,
    pub completed_orders: i64,
    pub pending_orders: i64,
    pub total_revenue: Decimal,
    pub total_subtotal: Decimal,
    pub total_discounts: Decimal,
    pub total_tax: Decimal,
    pub average_order_value: Option<Decimal>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct PaymentBreakdownRow {
    pub payment_method: String,
    pub order_count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct OrderTypeBreakdownRow {
    pub order_type: String,
    pub order_count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TopProductRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailySalesReport {
    pub date: NaiveDate,
    pub summary: DailySalesSummary,
    pub payment_breakdown: Vec<PaymentBreakdownRow>,
    pub order_type_breakdown: Vec<OrderTypeBreakdownRow>,
    pub top_products: Vec<TopProductRow>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MonthlyDayRow {
    pub date: NaiveDate,
    pub total_orders: i64,
    pub daily_revenue: Decimal,
    pub daily_subtotal: Decimal,
    pub daily_discounts: Decimal,
    pub daily_tax: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MonthlySummary {
    pub total_orders: i64,
    pub completed_orders: i64,
    pub total_revenue: Decimal,
    pub total_subtotal: Decimal,
    pub total_discounts: Decimal,
    pub total_tax: Decimal,
    pub average_order_value: Option<Decimal>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct CategoryPerformanceRow {
    pub category_name: String,
    pub category_color: Option<String>,
    pub order_count: i64,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MonthlyTopProductRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
    pub average_price: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub monthly_data: Vec<MonthlyDayRow>,
    pub monthly_summary: MonthlySummary,
    pub category_performance: Vec<CategoryPerformanceRow>,
    pub top_products: Vec<MonthlyTopProductRow>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ProfitOrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub revenue: Decimal,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfitSummary {
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    /// Percentage, 0 when the period has no revenue.
    pub profit_margin: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DailyProfitRow {
    pub date: NaiveDate,
    pub daily_revenue: Decimal,
    pub daily_cost: Decimal,
    pub daily_profit: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ProductProfitRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub profit_margin: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfitAnalysis {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub summary: ProfitSummary,
    pub daily_profit: Vec<DailyProfitRow>,
    pub product_profit: Vec<ProductProfitRow>,
    pub orders: Vec<ProfitOrderRow>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct StockUsageRow {
    pub id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub current_stock: Decimal,
    pub min_stock_level: Decimal,
    pub max_stock_level: Option<Decimal>,
    pub unit_cost: Decimal,
    pub total_stock_in: Decimal,
    pub total_stock_out: Decimal,
    pub total_cost_in: Decimal,
    pub total_cost_out: Decimal,
    pub net_stock_change: Decimal,
    pub usage_percentage: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DailyStockMovementRow {
    pub date: NaiveDate,
    pub transaction_type: String,
    pub total_quantity: Decimal,
    pub total_cost: Decimal,
    pub transaction_count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct CategoryStockUsageRow {
    pub id: Uuid,
    pub category_name: String,
    pub category_color: Option<String>,
    pub total_items: i64,
    pub total_current_stock: Decimal,
    pub total_usage: Decimal,
    pub total_usage_cost: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockUsageReport {
    pub stock_usage: Vec<StockUsageRow>,
    pub daily_movement: Vec<DailyStockMovementRow>,
    pub category_usage: Vec<CategoryStockUsageRow>,
}
