use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password::PasswordCredential;

/// User record. The credential column never serializes; the wrapper type
/// has no `Serialize` impl and the field is skipped.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    #[sqlx(rename = "password_hash")]
    pub credential: PasswordCredential,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Insert a new user. Returns the raw sqlx error so the caller can
/// translate a duplicate-email violation.
pub async fn create(
    db: &PgPool,
    email: &str,
    credential: &PasswordCredential,
    first_name: &str,
    last_name: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, $4)
        RETURNING id, email, password_hash, first_name, last_name, created_at, updated_at
        "#,
    )
    .bind(email)
    .bind(credential)
    .bind(first_name)
    .bind(last_name)
    .fetch_one(db)
    .await
}

pub async fn get_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, first_name, last_name, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn get_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, first_name, last_name, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Update profile fields. Returns the raw sqlx error so the caller can
/// translate a duplicate-email violation, same as `create`.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    email: &str,
    first_name: &str,
    last_name: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET email = $1, first_name = $2, last_name = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING id, email, password_hash, first_name, last_name, created_at, updated_at
        "#,
    )
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn update_credential(
    db: &PgPool,
    id: Uuid,
    credential: &PasswordCredential,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2
        "#,
    )
    .bind(credential)
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM users WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serialization_omits_credential() {
        let user = User {
            id: Uuid::new_v4(),
            email: "author@example.com".into(),
            credential: PasswordCredential::from_plaintext("hunter2-but-longer").unwrap(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&user).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("email"));
        assert!(obj.contains_key("first_name"));
        assert!(!obj.contains_key("credential"));
        assert!(!obj.contains_key("password_hash"));
        assert!(!json.to_string().contains("argon2"));
    }
}
