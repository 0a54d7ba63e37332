use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
    pub author_id: Uuid,
    #[sqlx(skip)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Paragraph {
    pub id: Uuid,
    pub headline: String,
    pub body: String,
    pub order_index: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Paragraph content as submitted; order comes from array position.
#[derive(Debug)]
pub struct NewParagraph {
    pub headline: String,
    pub body: String,
}

async fn insert_paragraphs(
    tx: &mut Transaction<'_, Postgres>,
    article_id: Uuid,
    paragraphs: &[NewParagraph],
) -> anyhow::Result<Vec<Paragraph>> {
    let mut inserted = Vec::with_capacity(paragraphs.len());
    for (index, paragraph) in paragraphs.iter().enumerate() {
        let row = sqlx::query_as::<_, Paragraph>(
            r#"
            INSERT INTO paragraphs (article_id, headline, body, order_index)
            VALUES ($1, $2, $3, $4)
            RETURNING id, headline, body, order_index, created_at, updated_at
            "#,
        )
        .bind(article_id)
        .bind(&paragraph.headline)
        .bind(&paragraph.body)
        .bind(index as i32)
        .fetch_one(&mut **tx)
        .await?;
        inserted.push(row);
    }
    Ok(inserted)
}

/// Insert the article and all its paragraphs in one transaction; either
/// every row commits or none do.
pub async fn create(
    db: &PgPool,
    author_id: Uuid,
    title: &str,
    description: &str,
    image: &str,
    paragraphs: &[NewParagraph],
) -> anyhow::Result<Article> {
    let mut tx = db.begin().await?;

    let mut article = sqlx::query_as::<_, Article>(
        r#"
        INSERT INTO articles (title, description, image, author_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id, title, description, image, author_id, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(image)
    .bind(author_id)
    .fetch_one(&mut *tx)
    .await?;

    article.paragraphs = insert_paragraphs(&mut tx, article.id, paragraphs).await?;

    tx.commit().await?;
    Ok(article)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Article>> {
    let article = sqlx::query_as::<_, Article>(
        r#"
        SELECT id, title, description, image, author_id, created_at, updated_at
        FROM articles
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;

    let Some(mut article) = article else {
        return Ok(None);
    };

    article.paragraphs = sqlx::query_as::<_, Paragraph>(
        r#"
        SELECT id, headline, body, order_index, created_at, updated_at
        FROM paragraphs
        WHERE article_id = $1
        ORDER BY order_index
        "#,
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    Ok(Some(article))
}

pub async fn get_author_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Uuid>> {
    let author_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT author_id FROM articles WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(author_id)
}

/// Replace the article row and its full paragraph set atomically. Returns
/// None when the article does not exist.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    title: &str,
    description: &str,
    image: &str,
    paragraphs: &[NewParagraph],
) -> anyhow::Result<Option<Article>> {
    let mut tx = db.begin().await?;

    let article = sqlx::query_as::<_, Article>(
        r#"
        UPDATE articles
        SET title = $1, description = $2, image = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING id, title, description, image, author_id, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(image)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(mut article) = article else {
        return Ok(None);
    };

    sqlx::query(
        r#"
        DELETE FROM paragraphs WHERE article_id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    article.paragraphs = insert_paragraphs(&mut tx, id, paragraphs).await?;

    tx.commit().await?;
    Ok(Some(article))
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM articles WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
