use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{InventoryItem, StockTransaction, StockTransactionType};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInventoryItemRequest {
    pub name: String,
    pub category_id: Option<Uuid>,
    pub current_stock: Decimal,
    pub min_stock_level: Decimal,
    pub max_stock_level: Option<Decimal>,
    pub unit: Option<String>,
    pub unit_cost: Decimal,
    pub unit_price: Option<Decimal>,
    pub supplier_info: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInventoryItemRequest {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_stock_level: Option<Decimal>,
    pub max_stock_level: Option<Decimal>,
    pub unit: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub supplier_info: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddStockRequest {
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeductStockRequest {
    pub quantity: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub delta: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryList {
    pub items: Vec<InventoryItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryItemWithTransactions {
    pub item: InventoryItem,
    pub transactions: Vec<StockTransaction>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransactionQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[serde(rename = "type")]
    pub transaction_type: Option<StockTransactionType>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockTransactionList {
    pub transactions: Vec<StockTransaction>,
}

/// Item whose stock is at or below its minimum level.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct LowStockAlert {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: InventoryItem,
    pub stock_needed: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ExpiryAlert {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: InventoryItem,
    pub days_until_expiry: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockAlertList {
    pub items: Vec<LowStockAlert>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExpiryAlertList {
    pub items: Vec<ExpiryAlert>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExpiryQuery {
    pub days: Option<i64>,
}
