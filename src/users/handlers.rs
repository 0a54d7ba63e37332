use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::{require_authenticated, AuthUser},
        password::PasswordCredential,
    },
    error::{ApiError, ApiResult},
    state::AppState,
    users::{
        dto::{RegisterRequest, UpdateUserRequest},
        repo,
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn open_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/:id", get(get_user))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:id", put(update_user).delete(delete_user))
        .route_layer(middleware::from_fn(require_authenticated))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::bad_request("invalid email"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::bad_request("password too short"));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(ApiError::bad_request("first and last name are required"));
    }

    let credential = PasswordCredential::from_plaintext(&payload.password)?;

    let user = repo::create(
        &state.db,
        &payload.email,
        &credential,
        payload.first_name.trim(),
        payload.last_name.trim(),
    )
    .await
    .map_err(|e| ApiError::from_unique_violation(e, "email already registered"))?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let user = repo::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(Json(json!({ "user": user })))
}

#[instrument(skip(state, requester, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<Value>> {
    if requester.id != id {
        return Err(ApiError::forbidden("you can only modify your own profile"));
    }

    let email = match payload.email {
        Some(email) => {
            let email = email.trim().to_lowercase();
            if !is_valid_email(&email) {
                return Err(ApiError::bad_request("invalid email"));
            }
            email
        }
        None => requester.email.clone(),
    };
    let first_name = payload.first_name.unwrap_or(requester.first_name);
    let last_name = payload.last_name.unwrap_or(requester.last_name);

    // Changing the email can collide with another account; surface that
    // as a conflict rather than an internal error.
    let user = repo::update(&state.db, id, &email, &first_name, &last_name)
        .await
        .map_err(|e| ApiError::from_unique_violation(e, "email already registered"))?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    info!(user_id = %user.id, "user updated");
    Ok(Json(json!({ "user": user })))
}

#[instrument(skip(state, requester))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if requester.id != id {
        return Err(ApiError::forbidden("you can only delete your own account"));
    }

    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::not_found("user not found"));
    }

    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("reader@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
    }
}
