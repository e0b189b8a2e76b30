use axum::{extract::State, http::StatusCode, Json};

use crate::error::{Error, Result};
use crate::models::user::{
    LoginRequest, RefreshRequest, RegisterRequest, TokenPair, User, UserResponse,
};
use crate::utils::{
    create_access_token, create_refresh_token, hash_password, verify_password,
    verify_refresh_token,
};
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPair>> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or(Error::InvalidCredentials)?;
    if !user.active {
        return Err(Error::UserInactive);
    }
    if !verify_password(&req.password, &user.password_hash)? {
        return Err(Error::InvalidCredentials);
    }

    issue_tokens(&state, &user)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    req.validate()?;

    let password_hash = hash_password(&req.password)?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (username, password_hash, email, phone, first_name, last_name, role, shop_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&req.username)
    .bind(&password_hash)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(req.role.as_str())
    .bind(req.shop_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict("user"),
        _ => Error::Persistence(e),
    })?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>> {
    let claims = verify_refresh_token(&req.refresh_token, &state.config.jwt_secret)
        .map_err(|_| Error::InvalidToken)?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(claims.sub)
        .fetch_optional(&state.db)
        .await?;

    let user = user.ok_or(Error::InvalidToken)?;
    if !user.active {
        return Err(Error::UserInactive);
    }

    issue_tokens(&state, &user)
}

fn issue_tokens(state: &AppState, user: &User) -> Result<Json<TokenPair>> {
    let access_token = create_access_token(
        user,
        &state.config.jwt_secret,
        state.config.jwt_expires_in_hours,
    )?;
    let refresh_token = create_refresh_token(
        user.id,
        &state.config.jwt_secret,
        state.config.refresh_expires_in_days,
    )?;

    Ok(Json(TokenPair {
        access_token,
        refresh_token,
    }))
}
