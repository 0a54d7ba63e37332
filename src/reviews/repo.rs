use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub stars: i32,
    pub note: Option<String>,
    pub author_id: Uuid,
    pub article_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Insert a review. The raw sqlx error is returned so the service can
/// translate a (author_id, article_id) unique violation into a conflict.
pub async fn create(
    db: &PgPool,
    author_id: Uuid,
    article_id: Uuid,
    stars: i32,
    note: Option<&str>,
) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (author_id, article_id, stars, note)
        VALUES ($1, $2, $3, $4)
        RETURNING id, stars, note, author_id, article_id, created_at, updated_at
        "#,
    )
    .bind(author_id)
    .bind(article_id)
    .bind(stars)
    .bind(note)
    .fetch_one(db)
    .await
}

pub async fn get_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Review>> {
    let review = sqlx::query_as::<_, Review>(
        r#"
        SELECT id, stars, note, author_id, article_id, created_at, updated_at
        FROM reviews
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(review)
}

pub async fn get_by_user_and_article(
    db: &PgPool,
    author_id: Uuid,
    article_id: Uuid,
) -> anyhow::Result<Option<Review>> {
    let review = sqlx::query_as::<_, Review>(
        r#"
        SELECT id, stars, note, author_id, article_id, created_at, updated_at
        FROM reviews
        WHERE author_id = $1 AND article_id = $2
        "#,
    )
    .bind(author_id)
    .bind(article_id)
    .fetch_optional(db)
    .await?;
    Ok(review)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    stars: i32,
    note: Option<&str>,
) -> anyhow::Result<Option<Review>> {
    let review = sqlx::query_as::<_, Review>(
        r#"
        UPDATE reviews
        SET stars = $1, note = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING id, stars, note, author_id, article_id, created_at, updated_at
        "#,
    )
    .bind(stars)
    .bind(note)
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(review)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM reviews WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
