use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::{require_authenticated, AuthUser},
    error::{ApiError, ApiResult},
    reviews::{
        dto::{CreateReviewRequest, UpdateReviewRequest},
        repo, service,
    },
    state::AppState,
};

pub fn open_routes() -> Router<AppState> {
    Router::new().route("/reviews/:id", get(get_review))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(create_review))
        .route("/reviews/:id", put(update_review).delete(delete_review))
        .route_layer(middleware::from_fn(require_authenticated))
}

#[instrument(skip(state, author, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(author): AuthUser,
    Json(payload): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let review = service::submit_review(
        &state.db,
        author.id,
        payload.article_id,
        payload.stars,
        payload.note.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "review": review }))))
}

#[instrument(skip(state))]
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let review = repo::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("review not found"))?;
    Ok(Json(json!({ "review": review })))
}

#[instrument(skip(state, requester, payload))]
pub async fn update_review(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> ApiResult<Json<Value>> {
    let review =
        service::update_review(&state.db, requester.id, id, payload.stars, payload.note).await?;
    Ok(Json(json!({ "review": review })))
}

#[instrument(skip(state, requester))]
pub async fn delete_review(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    service::delete_review(&state.db, requester.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
