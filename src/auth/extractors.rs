use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    auth::token::{self, Scope},
    error::ApiError,
    state::AppState,
    users::repo::{self, User},
};

/// Request identity attached by the `authenticate` middleware. Anonymous
/// is a real variant, not a null user: handlers that allow unauthenticated
/// reads pattern-match instead of probing for a sentinel.
#[derive(Debug, Clone)]
pub enum Identity {
    Authenticated(User),
    Anonymous,
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }
}

/// Strict `Bearer <token>` parse; anything else is malformed.
fn parse_bearer(header: &str) -> Option<&str> {
    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Resolves the Authorization header to an [`Identity`] and attaches it to
/// the request extensions. Requests without the header proceed as
/// Anonymous; a malformed header is a 400, an unknown or expired token a
/// 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = match req.headers().get(AUTHORIZATION) {
        None => Identity::Anonymous,
        Some(value) => {
            let header = value
                .to_str()
                .map_err(|_| ApiError::bad_request("invalid auth header format"))?;
            let plaintext = parse_bearer(header)
                .ok_or_else(|| ApiError::bad_request("invalid auth header format"))?;
            let record = match token::resolve(&state.db, plaintext, Scope::Authentication).await? {
                Some(record) if record.is_valid() => record,
                // Expired rows come back as data; both cases are the same
                // 401 to the client.
                _ => return Err(ApiError::unauthorized("invalid token")),
            };
            let user = repo::get_by_id(&state.db, record.user_id)
                .await?
                .ok_or_else(|| ApiError::unauthorized("invalid token"))?;
            Identity::Authenticated(user)
        }
    };
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Route-layer gate for mutation routes: anonymous callers are rejected
/// before the handler runs.
pub async fn require_authenticated(req: Request, next: Next) -> Result<Response, ApiError> {
    match req.extensions().get::<Identity>() {
        Some(Identity::Authenticated(_)) => Ok(next.run(req).await),
        Some(Identity::Anonymous) => Err(ApiError::unauthorized(
            "you must be authenticated to access this resource",
        )),
        None => Err(ApiError::Internal(anyhow::anyhow!(
            "identity missing from request extensions"
        ))),
    }
}

/// Extracts the authenticated user for handlers; rejects Anonymous.
#[derive(Debug)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity::Authenticated(user)) => Ok(AuthUser(user.clone())),
            Some(Identity::Anonymous) => Err(ApiError::unauthorized(
                "you must be authenticated to access this resource",
            )),
            None => Err(ApiError::Internal(anyhow::anyhow!(
                "identity missing from request extensions"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordCredential;
    use axum::http::StatusCode;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "reader@example.com".into(),
            credential: PasswordCredential::from_plaintext("irrelevant-here").unwrap(),
            first_name: "Test".into(),
            last_name: "Reader".into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn parse_bearer_accepts_well_formed_header() {
        assert_eq!(parse_bearer("Bearer abc123"), Some("abc123"));
    }

    #[test]
    fn parse_bearer_rejects_malformed_headers() {
        assert_eq!(parse_bearer(""), None);
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("bearer abc123"), None);
        assert_eq!(parse_bearer("Basic abc123"), None);
        assert_eq!(parse_bearer("Bearer abc 123"), None);
    }

    #[test]
    fn anonymous_is_distinguishable() {
        assert!(Identity::Anonymous.is_anonymous());
        assert!(!Identity::Authenticated(test_user()).is_anonymous());
    }

    #[tokio::test]
    async fn auth_user_extracts_authenticated_identity() {
        let req = axum::http::Request::builder().body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let user = test_user();
        parts.extensions.insert(Identity::Authenticated(user.clone()));

        let AuthUser(extracted) = AuthUser::from_request_parts(&mut parts, &())
            .await
            .expect("should extract");
        assert_eq!(extracted.id, user.id);
    }

    #[tokio::test]
    async fn auth_user_rejects_anonymous_identity() {
        let req = axum::http::Request::builder().body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        parts.extensions.insert(Identity::Anonymous);

        let err = AuthUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
