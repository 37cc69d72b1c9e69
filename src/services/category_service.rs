use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::products::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Category,
    response::{ApiResponse, Meta},
};

pub async fn list_categories(pool: &DbPool) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> =
        sqlx::query_as("SELECT * FROM categories ORDER BY sort_order, name")
            .fetch_all(pool)
            .await?;

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        None,
    ))
}

pub async fn create_category(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Category name is required".into()));
    }

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
        .bind(payload.name.as_str())
        .fetch_optional(pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest(
            "A category with this name already exists".into(),
        ));
    }

    let category: Category = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, color, sort_order)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.name.as_str())
    .bind(payload.color)
    .bind(payload.sort_order.unwrap_or(0))
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "category_create",
        Some("categories"),
        Some(serde_json::json!({ "category_id": category.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Category created",
        category,
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;

    let existing: Option<Category> = sqlx::query_as("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let color = payload.color.or(existing.color);
    let sort_order = payload.sort_order.unwrap_or(existing.sort_order);

    let duplicate: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM categories WHERE name = $1 AND id <> $2")
            .bind(name.as_str())
            .bind(id)
            .fetch_optional(pool)
            .await?;
    if duplicate.is_some() {
        return Err(AppError::BadRequest(
            "A category with this name already exists".into(),
        ));
    }

    let category: Category = sqlx::query_as(
        r#"
        UPDATE categories
        SET name = $2, color = $3, sort_order = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(color)
    .bind(sort_order)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success(
        "Category updated",
        category,
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    let in_use: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM products WHERE category_id = $1
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    if in_use.0 > 0 {
        return Err(AppError::BadRequest(
            "Cannot delete a category that has products".into(),
        ));
    }

    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "category_delete",
        Some("categories"),
        Some(serde_json::json!({ "category_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::message_only("Category deleted"))
}
