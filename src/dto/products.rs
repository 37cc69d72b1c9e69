use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecipeLineRequest {
    pub inventory_item_id: Uuid,
    pub quantity: Decimal,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub price: Decimal,
    pub cost_price: Option<Decimal>,
    pub sort_order: Option<i32>,
    pub recipe: Option<Vec<RecipeLineRequest>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub sort_order: Option<i32>,
    pub is_available: Option<bool>,
    // When present, replaces the full recipe.
    pub recipe: Option<Vec<RecipeLineRequest>>,
}

/// Recipe line joined with the ledger item's name.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ProductRecipeLine {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductWithRecipe {
    pub product: Product,
    pub recipe: Vec<ProductRecipeLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductSearchQuery {
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}
