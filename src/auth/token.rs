use anyhow::Context;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

/// Tag binding a token to one purpose; an authentication token can never
/// be replayed as a reset token or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Authentication,
    ResetPassword,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Authentication => "authentication",
            Scope::ResetPassword => "reset-password",
        }
    }
}

/// A freshly issued token. The plaintext exists only in this value and in
/// the creation response; the database holds the SHA-256 digest alone.
/// Deliberately no Debug impl, so the plaintext cannot end up in a log.
#[derive(Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub hash: Vec<u8>,
    #[serde(skip)]
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub expiry: OffsetDateTime,
    #[serde(skip)]
    pub scope: Scope,
}

/// Stored token row as seen at lookup time. `resolve` returns expired
/// rows as data; callers must check `is_valid` before trusting one.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRecord {
    pub user_id: Uuid,
    pub expiry: OffsetDateTime,
}

impl TokenRecord {
    pub fn is_valid(&self) -> bool {
        self.expiry > OffsetDateTime::now_utc()
    }
}

/// SHA-256 digest of a presented plaintext; the only form ever stored or
/// looked up.
pub fn digest(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

impl Token {
    pub fn generate(user_id: Uuid, ttl: Duration, scope: Scope) -> anyhow::Result<Token> {
        let mut bytes = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("read from random source")?;
        let plaintext = URL_SAFE_NO_PAD.encode(bytes);
        let hash = digest(&plaintext);
        Ok(Token {
            plaintext,
            hash,
            user_id,
            expiry: OffsetDateTime::now_utc() + ttl,
            scope,
        })
    }
}

/// Generate and persist a token, returning the plaintext exactly once.
pub async fn issue(
    db: &PgPool,
    user_id: Uuid,
    ttl: Duration,
    scope: Scope,
) -> anyhow::Result<Token> {
    let token = Token::generate(user_id, ttl, scope)?;
    sqlx::query(
        r#"
        INSERT INTO tokens (hash, user_id, expiry, scope)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&token.hash)
    .bind(token.user_id)
    .bind(token.expiry)
    .bind(scope.as_str())
    .execute(db)
    .await
    .context("insert token")?;
    Ok(token)
}

/// Look up a token by the digest of its plaintext, within one scope.
pub async fn resolve(
    db: &PgPool,
    plaintext: &str,
    scope: Scope,
) -> anyhow::Result<Option<TokenRecord>> {
    let record = sqlx::query_as::<_, TokenRecord>(
        r#"
        SELECT user_id, expiry
        FROM tokens
        WHERE hash = $1 AND scope = $2
        "#,
    )
    .bind(digest(plaintext))
    .bind(scope.as_str())
    .fetch_optional(db)
    .await
    .context("look up token")?;
    Ok(record)
}

/// Delete a token by digest. Idempotent: deleting a token that no longer
/// exists is not an error.
pub async fn invalidate(db: &PgPool, plaintext: &str, scope: Scope) -> anyhow::Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM tokens WHERE hash = $1 AND scope = $2
        "#,
    )
    .bind(digest(plaintext))
    .bind(scope.as_str())
    .execute(db)
    .await
    .context("delete token")?;
    if result.rows_affected() == 0 {
        debug!(scope = scope.as_str(), "invalidate: token already gone");
    }
    Ok(())
}

/// Drop every token a user holds in one scope; used for logout.
pub async fn delete_all_for_user(db: &PgPool, user_id: Uuid, scope: Scope) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM tokens WHERE user_id = $1 AND scope = $2
        "#,
    )
    .bind(user_id)
    .bind(scope.as_str())
    .execute(db)
    .await
    .context("delete user tokens")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_plaintext_is_url_safe_no_pad() {
        let token = Token::generate(Uuid::new_v4(), Duration::hours(24), Scope::Authentication)
            .expect("generate");
        // 32 bytes → 43 base64url chars, no padding.
        assert_eq!(token.plaintext.len(), 43);
        assert!(!token.plaintext.contains('='));
        assert!(token
            .plaintext
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn digest_is_deterministic_and_discriminating() {
        let token =
            Token::generate(Uuid::new_v4(), Duration::minutes(60), Scope::ResetPassword).unwrap();
        assert_eq!(token.hash, digest(&token.plaintext));
        assert_eq!(digest(&token.plaintext), digest(&token.plaintext));
        assert_ne!(digest(&token.plaintext), digest("some-other-plaintext"));
        assert_eq!(token.hash.len(), 32);
    }

    #[test]
    fn distinct_tokens_never_collide() {
        let a = Token::generate(Uuid::new_v4(), Duration::hours(1), Scope::Authentication).unwrap();
        let b = Token::generate(Uuid::new_v4(), Duration::hours(1), Scope::Authentication).unwrap();
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn expired_record_is_reported_invalid() {
        let expired = TokenRecord {
            user_id: Uuid::new_v4(),
            expiry: OffsetDateTime::now_utc() - Duration::seconds(1),
        };
        assert!(!expired.is_valid());

        let live = TokenRecord {
            user_id: Uuid::new_v4(),
            expiry: OffsetDateTime::now_utc() + Duration::hours(1),
        };
        assert!(live.is_valid());
    }

    #[test]
    fn serialization_exposes_only_plaintext_and_expiry() {
        let token =
            Token::generate(Uuid::new_v4(), Duration::hours(24), Scope::Authentication).unwrap();
        let json = serde_json::to_value(&token).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["token"], token.plaintext);
        assert!(obj.contains_key("expiry"));
        assert!(!obj.contains_key("hash"));
        assert!(!obj.contains_key("user_id"));
    }
}
