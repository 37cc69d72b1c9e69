use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    config,
    db::DbPool,
    dto::auth::{Claims, ChangePasswordRequest, CreateUserRequest, LoginRequest, LoginResponse},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
};

const TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

pub async fn login(pool: &DbPool, payload: LoginRequest) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { username, password } = payload;
    if username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".into(),
        ));
    }

    let row: Option<(Uuid, String)> = sqlx::query_as(
        "SELECT id, password_hash FROM users WHERE username = $1 AND is_active",
    )
    .bind(username.as_str())
    .fetch_optional(pool)
    .await?;

    let (user_id, password_hash) = match row {
        Some(r) => r,
        None => {
            return Err(AppError::BadRequest(
                "Invalid username or password".into(),
            ));
        }
    };

    verify_password(&password, &password_hash)?;

    let user: User = sqlx::query_as(
        r#"
        UPDATE users SET last_login = NOW()
        WHERE id = $1
        RETURNING id, username, role, is_active, last_login, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let token = issue_token(&user)?;

    if let Err(err) = log_audit(
        pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let resp = LoginResponse {
        token,
        user,
        expires_in: TOKEN_TTL_SECONDS,
    };

    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub async fn me(pool: &DbPool, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    let user: Option<User> = sqlx::query_as(
        "SELECT id, username, role, is_active, last_login, created_at, updated_at FROM users WHERE id = $1",
    )
    .bind(auth.user_id)
    .fetch_optional(pool)
    .await?;

    match user {
        Some(u) => Ok(ApiResponse::success("Profile", u, None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn change_password(
    pool: &DbPool,
    auth: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.new_password.len() < 6 {
        return Err(AppError::BadRequest(
            "New password must be at least 6 characters long".into(),
        ));
    }

    let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(pool)
        .await?;
    let (current_hash,) = match row {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };

    verify_password(&payload.current_password, &current_hash)
        .map_err(|_| AppError::BadRequest("Current password is incorrect".into()))?;

    let new_hash = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(auth.user_id)
        .bind(new_hash)
        .execute(pool)
        .await?;

    Ok(ApiResponse::message_only("Password changed"))
}

pub async fn create_user(
    pool: &DbPool,
    auth: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(auth)?;

    if payload.username.is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    if payload.password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters long".into(),
        ));
    }

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
        .bind(payload.username.as_str())
        .fetch_optional(pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("Username is already taken".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, role, is_active, last_login, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.username.as_str())
    .bind(password_hash)
    .bind(payload.role.as_str())
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(auth.user_id),
        "user_create",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "role": user.role })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("User created", user, None))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, hash: &str) -> AppResult<()> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::BadRequest("Invalid username or password".into()))
}

fn issue_token(user: &User) -> AppResult<String> {
    let secret = config::jwt_secret().map_err(AppError::Internal)?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::seconds(TOKEN_TTL_SECONDS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}
