use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    articles::{
        dto::ArticleRequest,
        repo::{self, NewParagraph},
    },
    auth::extractors::{require_authenticated, AuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn open_routes() -> Router<AppState> {
    Router::new().route("/articles/:id", get(get_article))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", post(create_article))
        .route("/articles/:id", put(update_article).delete(delete_article))
        .route_layer(middleware::from_fn(require_authenticated))
}

fn validate(payload: &ArticleRequest) -> ApiResult<Vec<NewParagraph>> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    Ok(payload
        .paragraphs
        .iter()
        .map(|p| NewParagraph {
            headline: p.headline.clone(),
            body: p.body.clone(),
        })
        .collect())
}

#[instrument(skip(state, author, payload))]
pub async fn create_article(
    State(state): State<AppState>,
    AuthUser(author): AuthUser,
    Json(payload): Json<ArticleRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let paragraphs = validate(&payload)?;

    let article = repo::create(
        &state.db,
        author.id,
        payload.title.trim(),
        &payload.description,
        &payload.image,
        &paragraphs,
    )
    .await?;

    info!(article_id = %article.id, author_id = %author.id, "article created");
    Ok((StatusCode::CREATED, Json(json!({ "article": article }))))
}

#[instrument(skip(state))]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let article = repo::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("article not found"))?;
    Ok(Json(json!({ "article": article })))
}

#[instrument(skip(state, requester, payload))]
pub async fn update_article(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ArticleRequest>,
) -> ApiResult<Json<Value>> {
    let paragraphs = validate(&payload)?;

    let author_id = repo::get_author_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("article not found"))?;
    if author_id != requester.id {
        return Err(ApiError::forbidden("you can only modify your own articles"));
    }

    let article = repo::update(
        &state.db,
        id,
        payload.title.trim(),
        &payload.description,
        &payload.image,
        &paragraphs,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("article not found"))?;

    info!(article_id = %article.id, "article updated");
    Ok(Json(json!({ "article": article })))
}

#[instrument(skip(state, requester))]
pub async fn delete_article(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let author_id = repo::get_author_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("article not found"))?;
    if author_id != requester.id {
        return Err(ApiError::forbidden("you can only delete your own articles"));
    }

    repo::delete(&state.db, id).await?;

    info!(article_id = %id, "article deleted");
    Ok(StatusCode::NO_CONTENT)
}
