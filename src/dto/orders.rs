use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    DiscountType, Order, OrderItem, OrderStatus, OrderType, PaymentMethod, PaymentStatus,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub notes: Option<String>,
}

/// Client-submitted prices are never accepted; lines carry only product and quantity.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub order_type: OrderType,
    pub payment_method: PaymentMethod,
    pub payment_status: Option<PaymentStatus>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub order_type: Option<OrderType>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
    pub discount_type: Option<DiscountType>,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DailySummaryQuery {
    pub date: Option<NaiveDate>,
}

/// Calendar-day totals over non-cancelled orders.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DailySummaryTotals {
    pub total_orders: i64,
    pub total_sales: Decimal,
    pub cash_sales: Decimal,
    pub card_sales: Decimal,
    pub online_sales: Decimal,
    pub total_discounts: Decimal,
    pub total_tax: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub summary: DailySummaryTotals,
    pub top_products: Vec<TopProduct>,
}
