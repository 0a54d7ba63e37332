use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{
    articles,
    error::{ApiError, ApiResult},
    reviews::repo::{self, Review},
};

/// Stars are 1..=5 inclusive; checked before any persistence call.
fn validate_stars(stars: i32) -> ApiResult<()> {
    if !(1..=5).contains(&stars) {
        return Err(ApiError::bad_request("stars must be between 1 and 5"));
    }
    Ok(())
}

/// Merge the incoming note with the stored one: an absent field keeps the
/// stored note, an empty string clears it.
fn merge_note(incoming: Option<String>, existing: Option<String>) -> Option<String> {
    match incoming {
        None => existing,
        Some(n) if n.is_empty() => None,
        Some(n) => Some(n),
    }
}

/// Decides whether a submission may proceed given the current article and
/// review state. Check order is fixed: missing article, then self-review,
/// then duplicate.
fn evaluate_submission(
    author_id: Uuid,
    article_author: Option<Uuid>,
    already_reviewed: bool,
) -> ApiResult<()> {
    let article_author = article_author.ok_or_else(|| ApiError::not_found("article not found"))?;
    if article_author == author_id {
        return Err(ApiError::forbidden("cannot review your own article"));
    }
    if already_reviewed {
        return Err(ApiError::conflict("you have already reviewed this article"));
    }
    Ok(())
}

/// Create a review, enforcing every submission invariant. The advisory
/// duplicate check gives the friendly error; the unique constraint on
/// (author_id, article_id) is the authoritative guard, so a concurrent
/// double-submit loses with the same 409.
pub async fn submit_review(
    db: &PgPool,
    author_id: Uuid,
    article_id: Uuid,
    stars: i32,
    note: Option<&str>,
) -> ApiResult<Review> {
    validate_stars(stars)?;

    let article_author = articles::repo::get_author_id(db, article_id).await?;
    let already_reviewed = repo::get_by_user_and_article(db, author_id, article_id)
        .await?
        .is_some();
    evaluate_submission(author_id, article_author, already_reviewed)?;

    let review = repo::create(db, author_id, article_id, stars, note)
        .await
        .map_err(|e| ApiError::from_unique_violation(e, "you have already reviewed this article"))?;

    info!(review_id = %review.id, article_id = %article_id, author_id = %author_id, "review created");
    Ok(review)
}

/// Update a review; only its author may, and stars are re-validated.
pub async fn update_review(
    db: &PgPool,
    requester_id: Uuid,
    review_id: Uuid,
    stars: Option<i32>,
    note: Option<String>,
) -> ApiResult<Review> {
    let existing = repo::get_by_id(db, review_id)
        .await?
        .ok_or_else(|| ApiError::not_found("review not found"))?;
    if existing.author_id != requester_id {
        return Err(ApiError::forbidden("you can only modify your own reviews"));
    }

    let stars = stars.unwrap_or(existing.stars);
    validate_stars(stars)?;
    let note = merge_note(note, existing.note);

    let review = repo::update(db, review_id, stars, note.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("review not found"))?;

    info!(review_id = %review.id, "review updated");
    Ok(review)
}

/// Delete a review; only its author may.
pub async fn delete_review(db: &PgPool, requester_id: Uuid, review_id: Uuid) -> ApiResult<()> {
    let existing = repo::get_by_id(db, review_id)
        .await?
        .ok_or_else(|| ApiError::not_found("review not found"))?;
    if existing.author_id != requester_id {
        return Err(ApiError::forbidden("you can only delete your own reviews"));
    }

    repo::delete(db, review_id).await?;

    info!(review_id = %review_id, "review deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn stars_must_be_in_range() {
        for stars in [i32::MIN, -1, 0, 6, 100, i32::MAX] {
            let err = validate_stars(stars).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
        for stars in 1..=5 {
            assert!(validate_stars(stars).is_ok());
        }
    }

    #[test]
    fn missing_article_is_not_found() {
        let err = evaluate_submission(Uuid::new_v4(), None, false).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn self_review_is_forbidden() {
        let author = Uuid::new_v4();
        let err = evaluate_submission(author, Some(author), false).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn duplicate_review_is_conflict() {
        let err = evaluate_submission(Uuid::new_v4(), Some(Uuid::new_v4()), true).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn fresh_review_of_another_author_passes() {
        assert!(evaluate_submission(Uuid::new_v4(), Some(Uuid::new_v4()), false).is_ok());
    }

    #[test]
    fn self_review_beats_duplicate_in_check_order() {
        // A reviewer who somehow already has a row still gets 403 for
        // their own article, matching the fixed check order.
        let author = Uuid::new_v4();
        let err = evaluate_submission(author, Some(author), true).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn note_update_keeps_replaces_or_clears() {
        let existing = || Some("solid read".to_string());
        assert_eq!(merge_note(None, existing()), existing());
        assert_eq!(
            merge_note(Some("changed my mind".into()), existing()),
            Some("changed my mind".to_string())
        );
        assert_eq!(merge_note(Some(String::new()), existing()), None);
        assert_eq!(merge_note(None, None), None);
    }

    #[test]
    fn submission_scenario_first_duplicate_then_owner() {
        let a = Uuid::new_v4(); // wrote the article
        let b = Uuid::new_v4(); // reviews it

        // B's first review passes every gate.
        assert!(validate_stars(4).is_ok());
        assert!(evaluate_submission(b, Some(a), false).is_ok());

        // B's second attempt conflicts.
        let err = evaluate_submission(b, Some(a), true).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        // A reviewing their own article is forbidden.
        let err = evaluate_submission(a, Some(a), false).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
