use crate::state::AppState;
use axum::Router;

mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod token;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::open_routes())
        .merge(handlers::protected_routes())
}
