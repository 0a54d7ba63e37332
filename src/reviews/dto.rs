use serde::Deserialize;
use uuid::Uuid;

/// Request body for review submission.
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub article_id: Uuid,
    pub stars: i32,
    pub note: Option<String>,
}

/// Request body for a review update; absent fields keep their value. An
/// empty `note` clears the stored note.
#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub stars: Option<i32>,
    pub note: Option<String>,
}
