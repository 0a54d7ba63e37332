use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, post},
    Json, Router,
};
use serde_json::{json, Value};
use time::Duration;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, ResetPasswordRequest, ResetTokenRequest},
        extractors::{require_authenticated, AuthUser},
        password::PasswordCredential,
        token::{self, Scope},
    },
    error::{ApiError, ApiResult},
    state::AppState,
    users::{handlers::is_valid_email, repo as users_repo},
};

pub fn open_routes() -> Router<AppState> {
    Router::new()
        .route("/tokens/authentication", post(login))
        .route("/tokens/password-reset", post(request_password_reset))
        .route("/tokens/password-reset/:token", post(reset_password))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/tokens/authentication", delete(logout))
        .route_layer(middleware::from_fn(require_authenticated))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::bad_request("invalid email"));
    }

    // Same message for unknown email and wrong password.
    let user = users_repo::get_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid credentials"))?;

    if !user.credential.verify(&payload.password)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    let ttl = Duration::hours(state.config.tokens.auth_ttl_hours);
    let token = token::issue(&state.db, user.id, ttl, Scope::Authentication).await?;

    info!(user_id = %user.id, "user logged in");
    Ok((StatusCode::CREATED, Json(json!({ "token": token }))))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<StatusCode> {
    token::delete_all_for_user(&state.db, user.id, Scope::Authentication).await?;
    info!(user_id = %user.id, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(mut payload): Json<ResetTokenRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::bad_request("invalid email"));
    }

    let user = users_repo::get_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let ttl = Duration::minutes(state.config.tokens.reset_ttl_minutes);
    let token = token::issue(&state.db, user.id, ttl, Scope::ResetPassword).await?;

    info!(user_id = %user.id, "reset token issued");
    Ok((StatusCode::CREATED, Json(json!({ "reset_token": token }))))
}

#[instrument(skip(state, plaintext, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(plaintext): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    if payload.new_password.is_empty() || payload.confirm_password.is_empty() {
        return Err(ApiError::bad_request(
            "new password and confirmation are required",
        ));
    }
    if payload.new_password != payload.confirm_password {
        return Err(ApiError::bad_request("passwords do not match"));
    }
    if payload.new_password.len() < 8 {
        return Err(ApiError::bad_request("password too short"));
    }

    let record = match token::resolve(&state.db, &plaintext, Scope::ResetPassword).await? {
        Some(record) if record.is_valid() => record,
        _ => return Err(ApiError::bad_request("invalid or expired reset token")),
    };

    let credential = PasswordCredential::from_plaintext(&payload.new_password)?;
    if !users_repo::update_credential(&state.db, record.user_id, &credential).await? {
        return Err(ApiError::not_found("user not found"));
    }

    // Best effort: the reset already succeeded, a leftover token row only
    // costs a log line.
    if let Err(e) = token::invalidate(&state.db, &plaintext, Scope::ResetPassword).await {
        warn!(error = %e, "failed to delete used reset token");
    }

    info!(user_id = %record.user_id, "password reset");
    Ok(Json(json!({ "message": "password reset successfully" })))
}
