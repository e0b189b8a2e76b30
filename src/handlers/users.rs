use axum::{extract::State, Json};

use crate::error::{Error, Result};
use crate::middleware::CurrentUser;
use crate::models::user::{ChangePasswordRequest, UpdateUserRequest, User, UserResponse};
use crate::utils::{hash_password, verify_password};
use crate::AppState;

pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<UserResponse>> {
    let user = fetch_user(&state, current_user.id).await?;
    Ok(Json(user.into()))
}

pub async fn update_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let user: User = sqlx::query_as(
        r#"
        UPDATE users
        SET email = COALESCE($2, email),
            phone = COALESCE($3, phone),
            first_name = COALESCE($4, first_name),
            last_name = COALESCE($5, last_name),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(current_user.id)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(user.into()))
}

pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    if req.new_password.len() < 8 {
        return Err(Error::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    if req.new_password == req.old_password {
        return Err(Error::Validation(
            "new password must differ from the old one".into(),
        ));
    }

    let user = fetch_user(&state, current_user.id).await?;
    if !verify_password(&req.old_password, &user.password_hash)? {
        return Err(Error::InvalidCredentials);
    }

    let password_hash = hash_password(&req.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
        .bind(user.id)
        .bind(&password_hash)
        .execute(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "message": "password updated" })))
}

async fn fetch_user(state: &AppState, id: uuid::Uuid) -> Result<User> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1 AND active = true")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;

    user.ok_or(Error::NotFound("user"))
}
