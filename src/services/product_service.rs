use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{
        CreateProductRequest, ProductList, ProductRecipeLine, ProductSearchQuery,
        ProductWithRecipe, RecipeLineRequest, UpdateProductRequest,
    },
    entity::{
        inventory_items::Entity as InventoryItems,
        product_recipes::{
            ActiveModel as RecipeActive, Column as RecipeCol, Entity as ProductRecipes,
        },
        products::{ActiveModel as ProductActive, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

const PRODUCT_WITH_CATEGORY: &str = r#"
    SELECT
        p.*,
        c.name AS category_name,
        c.color AS category_color
    FROM products p
    LEFT JOIN categories c ON p.category_id = c.id
"#;

pub async fn list_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let sql = format!("{PRODUCT_WITH_CATEGORY} ORDER BY c.sort_order, p.sort_order");
    let items: Vec<Product> = sqlx::query_as(&sql).fetch_all(&state.pool).await?;

    Ok(ApiResponse::success("Products", ProductList { items }, None))
}

pub async fn search_products(
    state: &AppState,
    query: ProductSearchQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let sql = format!(
        r#"{PRODUCT_WITH_CATEGORY}
        WHERE ($1::text IS NULL OR p.name ILIKE $1 OR p.description ILIKE $1)
          AND ($2::uuid IS NULL OR p.category_id = $2)
        ORDER BY c.sort_order, p.sort_order
        "#
    );
    let pattern = query
        .q
        .as_ref()
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{q}%"));
    let items: Vec<Product> = sqlx::query_as(&sql)
        .bind(pattern)
        .bind(query.category_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(ApiResponse::success("Products", ProductList { items }, None))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductWithRecipe>> {
    let data = load_product_with_recipe(state, id).await?;
    Ok(ApiResponse::success("Product", data, None))
}

async fn load_product_with_recipe(state: &AppState, id: Uuid) -> AppResult<ProductWithRecipe> {
    let sql = format!("{PRODUCT_WITH_CATEGORY} WHERE p.id = $1");
    let product: Option<Product> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let recipe = fetch_recipe(state, id).await?;

    Ok(ProductWithRecipe { product, recipe })
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductWithRecipe>> {
    ensure_admin(user)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name is required".into()));
    }
    if payload.price < Decimal::ZERO {
        return Err(AppError::BadRequest("Price must not be negative".into()));
    }

    let duplicate: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
        .bind(payload.name.as_str())
        .fetch_optional(&state.pool)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::BadRequest(
            "A product with this name already exists".into(),
        ));
    }

    let category: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE id = $1")
        .bind(payload.category_id)
        .fetch_optional(&state.pool)
        .await?;
    if category.is_none() {
        return Err(AppError::BadRequest("Category not found".into()));
    }

    let id = Uuid::new_v4();
    let txn = state.orm.begin().await?;

    ProductActive {
        id: Set(id),
        name: Set(payload.name),
        description: Set(payload.description),
        category_id: Set(payload.category_id),
        price: Set(payload.price),
        cost_price: Set(payload.cost_price.unwrap_or(Decimal::ZERO)),
        sort_order: Set(payload.sort_order.unwrap_or(999)),
        is_available: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    if let Some(lines) = payload.recipe {
        replace_recipe(&txn, id, lines).await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let data = load_product_with_recipe(state, id).await?;
    Ok(ApiResponse::success(
        "Product created",
        data,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductWithRecipe>> {
    ensure_admin(user)?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if let Some(name) = payload.name.as_ref() {
        let duplicate: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM products WHERE name = $1 AND id <> $2")
                .bind(name.as_str())
                .bind(id)
                .fetch_optional(&state.pool)
                .await?;
        if duplicate.is_some() {
            return Err(AppError::BadRequest(
                "A product with this name already exists".into(),
            ));
        }
    }
    if let Some(category_id) = payload.category_id {
        let category: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&state.pool)
            .await?;
        if category.is_none() {
            return Err(AppError::BadRequest("Category not found".into()));
        }
    }
    if let Some(price) = payload.price {
        if price < Decimal::ZERO {
            return Err(AppError::BadRequest("Price must not be negative".into()));
        }
    }

    let txn = state.orm.begin().await?;

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(cost_price) = payload.cost_price {
        active.cost_price = Set(cost_price);
    }
    if let Some(sort_order) = payload.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(is_available) = payload.is_available {
        active.is_available = Set(is_available);
    }
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(&txn).await?;

    if let Some(lines) = payload.recipe {
        replace_recipe(&txn, id, lines).await?;
    }

    txn.commit().await?;

    let data = load_product_with_recipe(state, id).await?;
    Ok(ApiResponse::success(
        "Product updated",
        data,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    // Historical bills must keep resolving; referenced products can only be
    // marked unavailable, never removed.
    let usage: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM order_items WHERE product_id = $1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    if usage.0 > 0 {
        return Err(AppError::BadRequest(
            "Cannot delete a product that has been used in orders".into(),
        ));
    }

    // Recipe rows go with the product (ON DELETE CASCADE).
    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::message_only("Product deleted"))
}

async fn fetch_recipe(state: &AppState, product_id: Uuid) -> AppResult<Vec<ProductRecipeLine>> {
    let recipe: Vec<ProductRecipeLine> = sqlx::query_as(
        r#"
        SELECT pr.id, pr.inventory_item_id, ii.name AS item_name, pr.quantity, pr.unit
        FROM product_recipes pr
        JOIN inventory_items ii ON ii.id = pr.inventory_item_id
        WHERE pr.product_id = $1
        ORDER BY ii.name
        "#,
    )
    .bind(product_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(recipe)
}

async fn replace_recipe<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    lines: Vec<RecipeLineRequest>,
) -> AppResult<()> {
    for line in &lines {
        if line.quantity <= Decimal::ZERO {
            return Err(AppError::BadRequest(
                "Recipe quantities must be positive".into(),
            ));
        }
        let item = InventoryItems::find_by_id(line.inventory_item_id)
            .one(conn)
            .await?;
        if item.is_none() {
            return Err(AppError::BadRequest(format!(
                "Inventory item {} not found",
                line.inventory_item_id
            )));
        }
    }

    ProductRecipes::delete_many()
        .filter(RecipeCol::ProductId.eq(product_id))
        .exec(conn)
        .await?;

    for line in lines {
        RecipeActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            inventory_item_id: Set(line.inventory_item_id),
            quantity: Set(line.quantity),
            unit: Set(line.unit.unwrap_or_else(|| "unit".to_string())),
        }
        .insert(conn)
        .await?;
    }

    Ok(())
}
